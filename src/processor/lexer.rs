//! Section splitter and a tiny character scanner for the map format.
//!
//! The splitter only breaks raw text into named sections of trimmed,
//! comment-stripped lines. Nothing is interpreted yet; each stage picks the
//! sections it cares about later.
//
//  Lexical rules (informal):
//
//      header   ::= '[' name ']'          (whole line)
//      comment  ::= '#' .*                (whole line)
//      trailing ::= WS '#' .*             (unless '#' is followed by a hex digit,
//                                          so `color: #fff` survives)
//
//  Section keys are lowercased, non-[a-z0-9] runs collapse to '_', the
//  result is trimmed of '_' and an empty key becomes `meta`.

use std::iter::Peekable;
use std::str::Chars;

pub const META_SECTION: &str = "meta";

/// One kept line of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the source text.
    pub number: usize,
    /// Trimmed text before any comment handling.
    pub raw: String,
    /// Text after comment stripping; `None` if the whole line is a comment.
    pub code: Option<String>,
}

impl Line {
    /// Raw text with only the trailing-comment rule applied.
    ///
    /// Grid sections use this when `#` is a tile symbol rather than a
    /// comment marker.
    pub fn without_trailing_comment(&self) -> &str {
        strip_trailing_comment(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    /// Header text of the first occurrence, e.g. `Layer Ground`.
    pub title: String,
    pub lines: Vec<Line>,
}

impl Section {
    fn new(key: String, title: String) -> Self {
        Self {
            key,
            title,
            lines: Vec::new(),
        }
    }

    /// Comment-stripped lines, in file order.
    pub fn code_lines(&self) -> impl Iterator<Item = (&Line, &str)> {
        self.lines
            .iter()
            .filter_map(|line| line.code.as_deref().map(|code| (line, code)))
    }
}

/// Sections in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    sections: Vec<Section>,
}

impl Sections {
    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn with_prefix<'s>(&'s self, prefix: &'s str) -> impl Iterator<Item = &'s Section> + 's {
        self.sections.iter().filter(move |s| s.key.starts_with(prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    fn entry(&mut self, key: String, title: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.key == key) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(key, title.to_string()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }
}

pub fn normalise_section_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(c);
        } else {
            pending_sep = true;
        }
    }
    if key.is_empty() {
        META_SECTION.to_string()
    } else {
        key
    }
}

/// Truncates at the first whitespace-then-`#` that does not start a hex
/// literal.
pub fn strip_trailing_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i] == b'#' && bytes[i - 1].is_ascii_whitespace() {
            let hex_follows = bytes.get(i + 1).is_some_and(|b| b.is_ascii_hexdigit());
            if !hex_follows {
                return line[..i].trim_end();
            }
        }
    }
    line
}

fn section_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() || inner.contains(']') {
        return None;
    }
    Some(inner)
}

/// Splits raw text into sections. Leading untitled content lands in `meta`.
pub fn split_sections(src: &str) -> Sections {
    let mut sections = Sections {
        sections: vec![Section::new(META_SECTION.into(), "Meta".into())],
    };
    let mut current = META_SECTION.to_string();

    for (idx, raw_line) in src.lines().enumerate() {
        let raw = raw_line.trim();
        if raw.is_empty() {
            continue;
        }

        let code = if raw.starts_with('#') {
            None
        } else {
            Some(strip_trailing_comment(raw)).filter(|c| !c.is_empty())
        };

        if let Some(name) = code.and_then(section_header) {
            current = normalise_section_key(name);
            sections.entry(current.clone(), name.trim());
            continue;
        }

        sections.entry(current.clone(), &current).lines.push(Line {
            number: idx + 1,
            raw: raw.to_string(),
            code: code.map(str::to_string),
        });
    }

    sections
}

/// Character cursor used by the line grammars.
#[derive(Clone)]
pub struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
        }
    }

    pub fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    pub fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consumes `c` if it is next.
    pub fn eat(&mut self, c: char) -> bool {
        self.chars.next_if_eq(&c).is_some()
    }

    pub fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let mut buf = String::new();
        while let Some(c) = self.chars.next_if(|c| pred(*c)) {
            buf.push(c);
        }
        buf
    }

    /// Returns `true` if any whitespace was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        !self.consume_while(char::is_whitespace).is_empty()
    }

    pub fn rest(&mut self) -> String {
        self.chars.by_ref().collect()
    }

    pub fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}
