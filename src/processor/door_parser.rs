//! Door metadata → `Door` links plus the placements for outbound doors.
//!
//! ```text
//! entry  ::= coord [ ('->' | ':') remainder ]
//! remainder ::= targetMap '@' [coord] | '@' coord | targetMap
//! ```

use serde_json::{Value, json};

use super::ids::IdRegistry;
use super::values::parse_coordinate;
use crate::error::{MapError, Result};
use crate::model::{DOOR_TEMPLATE_ID, Door, DoorKind, Metadata, ObjectPlacement, Position, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorEntry {
    pub position: Position,
    pub target_map: Option<String>,
    pub target_position: Option<Position>,
}

/// Splits a door list on `;`, `,` and newlines, dropping blanks.
pub fn split_door_entries(value: &str) -> Vec<String> {
    value
        .split([';', ',', '\n'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_door_entry(entry: &str) -> Result<DoorEntry> {
    let invalid = |reason: &str| MapError::InvalidDoorCoordinate {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };

    let (coordinate, remainder) = entry
        .split_once("->")
        .or_else(|| entry.split_once(':'))
        .unwrap_or((entry, ""));
    let position =
        parse_coordinate(coordinate).ok_or_else(|| invalid("door coordinate is not `XxY`"))?;

    let remainder = remainder.trim();
    let (target_map, target_position) = match remainder.split_once('@') {
        Some((map, target)) => {
            let target = target.trim();
            let target_position = if target.is_empty() {
                None
            } else {
                Some(parse_coordinate(target).ok_or_else(|| invalid("target coordinate is not `XxY`"))?)
            };
            (map.trim(), target_position)
        }
        None => (remainder, None),
    };

    Ok(DoorEntry {
        position,
        target_map: Some(target_map.to_string()).filter(|m| !m.is_empty()),
        target_position,
    })
}

fn door_placement(door: &Door, label: String) -> ObjectPlacement {
    let mut metadata = Metadata::new();
    metadata.insert("type".into(), json!("door"));
    metadata.insert("objectId".into(), json!(DOOR_TEMPLATE_ID));
    metadata.insert("instanceId".into(), Value::String(door.id.clone()));
    metadata.insert("doorKind".into(), json!(door.kind.as_str()));
    if let Some(map) = &door.target_map {
        metadata.insert("targetMap".into(), Value::String(map.clone()));
    }
    if let Some(target) = door.target_position {
        metadata.insert("targetPosition".into(), json!({ "x": target.x, "y": target.y }));
    }

    ObjectPlacement {
        id: door.id.clone(),
        name: label,
        position: door.position,
        size: Size::UNIT,
        solid: false,
        object_id: Some(DOOR_TEMPLATE_ID.to_string()),
        metadata,
        appearance: None,
        interaction: None,
    }
}

fn build_kind(
    entries: &[String],
    kind: DoorKind,
    map_id: &str,
    ids: &mut IdRegistry,
    doors: &mut Vec<Door>,
    objects: &mut Vec<ObjectPlacement>,
) -> Result<()> {
    for (index, raw) in entries.iter().enumerate() {
        let entry = parse_door_entry(raw)?;
        let door = Door {
            id: ids.allocate(&format!("{map_id}-door-{}", kind.as_str())),
            kind,
            position: entry.position,
            target_map: entry.target_map,
            target_position: entry.target_position,
        };
        if kind == DoorKind::Out {
            let label = if entries.len() > 1 {
                format!("Acceso {}", index + 1)
            } else {
                "Acceso principal".to_string()
            };
            objects.push(door_placement(&door, label));
        }
        doors.push(door);
    }
    Ok(())
}

/// Outbound entries first, then inbound, each in author order. Only
/// outbound doors get a placement.
pub fn build_doors(
    out_entries: &[String],
    in_entries: &[String],
    map_id: &str,
    ids: &mut IdRegistry,
) -> Result<(Vec<Door>, Vec<ObjectPlacement>)> {
    let mut doors = Vec::new();
    let mut objects = Vec::new();
    build_kind(out_entries, DoorKind::Out, map_id, ids, &mut doors, &mut objects)?;
    build_kind(in_entries, DoorKind::In, map_id, ids, &mut doors, &mut objects)?;
    log::debug!(
        "map `{map_id}`: {} doors, {} door placements",
        doors.len(),
        objects.len()
    );
    Ok((doors, objects))
}

/// Outbound entries from `doorOut`, or the single legacy `doorPosition`.
pub fn outbound_entries(door_out: Option<&str>, legacy_position: Option<&str>) -> Vec<String> {
    if let Some(door_out) = door_out {
        return split_door_entries(door_out);
    }
    match legacy_position {
        Some(raw) => match parse_coordinate(raw) {
            Some(p) => vec![format!("{}x{}", p.x, p.y)],
            None => {
                log::warn!("ignoring unparsable doorPosition `{raw}`");
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}
