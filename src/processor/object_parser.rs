//! `[Objects*]` sections: one placement per line.
//!
//! ```text
//! [-] [!] objectId[#instanceId] (@ | : | ws) X (x | , | ws) Y [| label]
//! ```

use serde_json::Value;

use super::ids::IdRegistry;
use super::lexer::{Scanner, Section};
use crate::error::{MapError, Result};
use crate::model::{Metadata, ObjectLayer, ObjectPlacement, Position, Size};

/// One object line, before id allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLine {
    pub object_id: String,
    pub instance_id: Option<String>,
    pub solid: bool,
    pub position: Position,
    pub label: Option<String>,
}

fn is_ref_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn coordinate(scanner: &mut Scanner<'_>, axis: &str) -> Result<i32, String> {
    let digits = scanner.consume_while(|c| c.is_ascii_digit());
    if digits.is_empty() {
        return Err(format!("missing {axis} coordinate"));
    }
    digits
        .parse()
        .map_err(|_| format!("{axis} coordinate `{digits}` is out of range"))
}

/// Parses a single line; the error is a human-readable reason.
pub fn parse_object_line(text: &str) -> Result<ObjectLine, String> {
    let mut s = Scanner::new(text);
    s.skip_whitespace();
    if s.eat('-') {
        s.skip_whitespace();
    }
    let solid = s.eat('!');
    s.skip_whitespace();

    let object_id = s.consume_while(is_ref_char);
    if object_id.is_empty() {
        return Err("missing object id".into());
    }
    let instance_id = if s.eat('#') {
        let instance = s.consume_while(is_ref_char);
        if instance.is_empty() {
            return Err("empty instance id after `#`".into());
        }
        Some(instance)
    } else {
        None
    };

    let spaced = s.skip_whitespace();
    if s.eat('@') || s.eat(':') {
        s.skip_whitespace();
    } else if !spaced {
        return Err("expected `@`, `:` or whitespace before the coordinates".into());
    }
    let x = coordinate(&mut s, "x")?;

    let spaced_before = s.skip_whitespace();
    let separated = s.eat('x') || s.eat('X') || s.eat(',');
    let spaced = s.skip_whitespace() || spaced_before;
    if !separated && !spaced {
        return Err("expected `x`, `,` or whitespace between the coordinates".into());
    }
    let y = coordinate(&mut s, "y")?;

    s.skip_whitespace();
    let label = if s.at_end() {
        None
    } else if s.eat('|') {
        Some(s.rest().trim().to_string()).filter(|l| !l.is_empty())
    } else {
        return Err(format!("unexpected trailing text `{}`", s.rest().trim()));
    };

    Ok(ObjectLine {
        object_id,
        instance_id,
        solid,
        position: Position::new(x, y),
        label,
    })
}

impl ObjectLine {
    /// Allocates the placement id and builds the placement.
    pub fn into_placement(self, ids: &mut IdRegistry) -> ObjectPlacement {
        let requested = self
            .instance_id
            .clone()
            .unwrap_or_else(|| self.object_id.clone());
        let id = ids.allocate(&requested);

        let mut metadata = Metadata::new();
        metadata.insert("objectId".into(), Value::String(self.object_id.clone()));
        metadata.insert("instanceId".into(), Value::String(id.clone()));
        if id != requested {
            metadata.insert("originalInstanceId".into(), Value::String(requested));
        }

        ObjectPlacement {
            name: self.label.unwrap_or_else(|| id.clone()),
            id,
            position: self.position,
            size: Size::UNIT,
            solid: self.solid,
            object_id: Some(self.object_id),
            metadata,
            appearance: None,
            interaction: None,
        }
    }
}

fn compile_section(section: &Section, order: usize, ids: &mut IdRegistry) -> Result<ObjectLayer> {
    let mut objects = Vec::new();
    for (entry, (line, code)) in section.code_lines().enumerate() {
        let parsed = parse_object_line(code).map_err(|reason| MapError::MalformedObjectLine {
            section: section.key.clone(),
            entry: entry + 1,
            line: line.number,
            content: code.to_string(),
            reason,
        })?;
        objects.push(parsed.into_placement(ids));
    }
    Ok(ObjectLayer {
        id: section.key.clone(),
        name: section.title.clone(),
        order: order as i32,
        visible: true,
        objects,
    })
}

/// One `ObjectLayer` per section, in declaration order.
pub fn compile_object_layers<'s>(
    sections: impl Iterator<Item = &'s Section>,
    ids: &mut IdRegistry,
) -> Result<Vec<ObjectLayer>> {
    let mut layers = Vec::new();
    for (order, section) in sections.enumerate() {
        let layer = compile_section(section, order, ids)?;
        log::debug!("object layer `{}`: {} placements", layer.id, layer.objects.len());
        layers.push(layer);
    }
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::lexer::split_sections;

    #[test]
    fn test_line_variants() {
        let cases = [
            ("lamp@1x1", ("lamp", None, false, 1, 1, None)),
            ("- !crate#c1 : 3, 4", ("crate", Some("c1"), true, 3, 4, None)),
            ("tree 5 6", ("tree", None, false, 5, 6, None)),
            ("sign.old@2X7 | Cartel viejo", ("sign.old", None, false, 2, 7, Some("Cartel viejo"))),
            ("bench@0x0 |   ", ("bench", None, false, 0, 0, None)),
            ("lamp@1 , 2", ("lamp", None, false, 1, 2, None)),
            ("lamp@1 x 2", ("lamp", None, false, 1, 2, None)),
            ("lamp 1 ,2", ("lamp", None, false, 1, 2, None)),
        ];
        for (input, (object_id, instance, solid, x, y, label)) in cases {
            let line = parse_object_line(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(line.object_id, object_id, "input {input:?}");
            assert_eq!(line.instance_id.as_deref(), instance, "input {input:?}");
            assert_eq!(line.solid, solid, "input {input:?}");
            assert_eq!(line.position, Position::new(x, y), "input {input:?}");
            assert_eq!(line.label.as_deref(), label, "input {input:?}");
        }
    }

    #[test]
    fn test_malformed_lines() {
        for input in ["@1x1", "lamp", "lamp@", "lamp@1", "lamp@1x", "lamp#@1x1", "lamp@1x1 extra", "lamp@-1x1"] {
            assert!(parse_object_line(input).is_err(), "input {input:?} should fail");
        }
    }

    #[test]
    fn test_ids_and_metadata() {
        let mut ids = IdRegistry::new();
        let first = parse_object_line("lamp@1x1").unwrap().into_placement(&mut ids);
        let second = parse_object_line("lamp@2x1").unwrap().into_placement(&mut ids);
        let named = parse_object_line("lamp#lamp@3x1 | Farol").unwrap().into_placement(&mut ids);

        assert_eq!(first.id, "lamp");
        assert_eq!(first.name, "lamp");
        assert!(!first.metadata.contains_key("originalInstanceId"));
        assert_eq!(second.id, "lamp-2");
        assert_eq!(second.metadata["originalInstanceId"], "lamp");
        assert_eq!(named.id, "lamp-3");
        assert_eq!(named.name, "Farol");
        assert_eq!(named.metadata["objectId"], "lamp");
        assert_eq!(named.metadata["instanceId"], "lamp-3");
        assert_eq!(named.object_id.as_deref(), Some("lamp"));
    }

    #[test]
    fn test_sections_become_layers() {
        let src = "[Objects]\nlamp@1x1\n[Objects Roof]\nlamp@1x1\nflag@0x0\n";
        let sections = split_sections(src);
        let mut ids = IdRegistry::new();
        let layers = compile_object_layers(sections.with_prefix("objects"), &mut ids).expect("layers");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].id, "objects_roof");
        assert_eq!(layers[1].name, "Objects Roof");
        assert_eq!(layers[1].order, 1);
        assert_eq!(layers[1].objects[0].id, "lamp-2");
    }

    #[test]
    fn test_error_names_entry_and_line() {
        let sections = split_sections("[Objects]\n# note\nlamp@1x1\nbroken line here\n");
        let mut ids = IdRegistry::new();
        let err = compile_object_layers(sections.with_prefix("objects"), &mut ids).unwrap_err();
        match err {
            MapError::MalformedObjectLine { entry, line, .. } => {
                assert_eq!(entry, 2);
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
