//! Scalar value parsing shared by the MDL and Tiled front ends.

use serde_json::Value;

use super::lexer::Section;
use crate::model::{Metadata, Position, Size};

/// Lowercase alphanumerics only, so `doorOut`, `door_out` and `Door Out`
/// all name the same key.
pub fn compact_key(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// `Starting Point` → `startingPoint`, `door_out` → `doorOut`; existing
/// camelCase is left alone.
pub fn camel_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = if word.chars().all(|c| !c.is_ascii_lowercase()) {
            word.to_ascii_lowercase()
        } else {
            word.to_string()
        };
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if out.is_empty() {
                out.push(first.to_ascii_lowercase());
            } else {
                out.push(first.to_ascii_uppercase());
            }
            out.extend(chars);
        }
    }
    out
}

fn two_ints<'a>(parts: impl Iterator<Item = &'a str>) -> Option<(i32, i32)> {
    let parts: Vec<&str> = parts.map(str::trim).filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [x, y] => Some((x.parse().ok()?, y.parse().ok()?)),
        _ => None,
    }
}

/// `3x4`, `3,4` or `3 4`.
pub fn parse_coordinate(value: &str) -> Option<Position> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    two_ints(value.split(['x', 'X', ',']))
        .or_else(|| two_ints(value.split_whitespace()))
        .map(|(x, y)| Position::new(x, y))
}

/// `WxH` with both sides strictly positive.
pub fn parse_dimensions(value: &str) -> Option<Size> {
    let (w, h) = two_ints(value.split(['x', 'X']))?;
    if w <= 0 || h <= 0 {
        return None;
    }
    Some(Size::new(w as u32, h as u32))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "solid" => Some(true),
        "false" | "0" | "no" | "off" | "transparent" | "none" => Some(false),
        _ => None,
    }
}

/// Same rules as [`parse_bool`] for JSON property values.
pub fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

/// `key: value` lines of the `meta` section.
#[derive(Debug, Clone, Default)]
pub struct MetaTable {
    entries: Vec<(String, String, String)>,
}

impl MetaTable {
    pub fn from_section(section: Option<&Section>) -> Self {
        let mut entries = Vec::new();
        for (line, code) in section.into_iter().flat_map(Section::code_lines) {
            let Some((key, value)) = code.split_once(':') else {
                log::debug!("meta line {} has no `key: value` pair, skipped", line.number);
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.push((compact_key(key), key.to_string(), value.trim().to_string()));
        }
        Self { entries }
    }

    /// Last non-empty value whose key matches any of `keys`, in key order.
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|wanted| {
            let wanted = compact_key(wanted);
            self.entries
                .iter()
                .rev()
                .find(|(compact, _, value)| *compact == wanted && !value.is_empty())
                .map(|(_, _, value)| value.as_str())
        })
    }

    /// Every entry whose key is not in `known`, camel-cased.
    pub fn extra(&self, known: &[&str]) -> Metadata {
        let known: Vec<String> = known.iter().map(|k| compact_key(k)).collect();
        let mut extra = Metadata::new();
        for (compact, raw, value) in &self.entries {
            if !known.contains(compact) {
                extra.insert(camel_case(raw), Value::String(value.clone()));
            }
        }
        extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::lexer::split_sections;

    #[test]
    fn test_parse_coordinate() {
        let cases = [
            ("1x0", Some((1, 0))),
            ("2, 3", Some((2, 3))),
            ("4 5", Some((4, 5))),
            (" 7 X 8 ", Some((7, 8))),
            ("1x2x3", None),
            ("abc", None),
            ("", None),
        ];
        for (input, expected) in cases {
            assert_eq!(
                parse_coordinate(input),
                expected.map(|(x, y)| Position::new(x, y)),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("3x3"), Some(Size::new(3, 3)));
        assert_eq!(parse_dimensions("12 x 8"), Some(Size::new(12, 8)));
        assert_eq!(parse_dimensions("0x3"), None);
        assert_eq!(parse_dimensions("3"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("solid"), Some(true));
        assert_eq!(parse_bool("none"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_key_normalisation() {
        assert_eq!(compact_key("Door Out"), "doorout");
        assert_eq!(camel_case("Starting Point"), "startingPoint");
        assert_eq!(camel_case("door_out"), "doorOut");
        assert_eq!(camel_case("doorOut"), "doorOut");
        assert_eq!(camel_case("BORDER COLOUR"), "borderColour");
    }

    #[test]
    fn test_meta_table_lookup() {
        let sections = split_sections(
            "id: plaza\nDoor Out: 1x0\ntitle:\nmood: calm\nid: plaza_2\n",
        );
        let meta = MetaTable::from_section(sections.get("meta"));
        assert_eq!(meta.get(&["id"]), Some("plaza_2"));
        assert_eq!(meta.get(&["doorOut"]), Some("1x0"));
        assert_eq!(meta.get(&["title", "id"]), Some("plaza_2"));
        let extra = meta.extra(&["id", "doorOut", "title"]);
        assert_eq!(extra.get("mood"), Some(&Value::String("calm".into())));
        assert_eq!(extra.len(), 1);
    }
}
