//! Turns `[Layer*]` sections into validated tile matrices.
//!
//! Leading `key: value` lines are layer properties; everything after the
//! first row is grid data.

use super::lexer::Section;
use super::tile_parser::TileTable;
use super::values::{compact_key, parse_bool};
use crate::error::{MapError, Result};
use crate::model::{LayerPlacement, TileLayer};

const EMPTY_CELLS: [&str; 4] = ["none", "empty", "void", "transparent"];

fn property(text: &str) -> Option<(&str, &str)> {
    let (key, value) = text.split_once(':')?;
    let key = key.trim();
    let mut chars = key.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let identifier = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '));
    (starts_alpha && identifier).then(|| (key, value.trim()))
}

fn apply_property(layer: &mut TileLayer, key: &str, value: &str) {
    match compact_key(key).as_str() {
        "id" if !value.is_empty() => layer.id = value.to_string(),
        "name" if !value.is_empty() => layer.name = value.to_string(),
        "order" => match value.parse() {
            Ok(order) => layer.order = order,
            Err(_) => log::warn!("layer `{}`: ignoring non-integer order `{value}`", layer.id),
        },
        "visible" => {
            if let Some(visible) = parse_bool(value) {
                layer.visible = visible;
            }
        }
        "placement" => match LayerPlacement::parse(value) {
            Some(placement) => layer.placement = Some(placement),
            None => log::warn!("layer `{}`: unknown placement `{value}`", layer.id),
        },
        "elevation" => {
            if let Ok(elevation) = value.parse::<f32>() {
                layer.elevation = Some(elevation);
            }
        }
        "opacity" => {
            if let Ok(opacity) = value.parse::<f32>() {
                layer.opacity = Some(opacity.clamp(0.0, 1.0));
            }
        }
        other => log::debug!("layer `{}`: unknown property `{other}`", layer.id),
    }
}

/// Splits a row on whitespace; a lone multi-character token is a dense
/// row and is split into characters instead.
pub fn row_tokens(row: &str) -> Vec<String> {
    let tokens: Vec<&str> = row.split_whitespace().collect();
    match tokens.as_slice() {
        [dense] if dense.chars().count() > 1 => dense.chars().map(String::from).collect(),
        _ => tokens.into_iter().map(String::from).collect(),
    }
}

fn resolve_cell(token: &str, tiles: &TileTable, layer: &str, row: usize) -> Result<Option<String>> {
    if EMPTY_CELLS.iter().any(|e| token.eq_ignore_ascii_case(e)) {
        return Ok(None);
    }
    if let Some(id) = tiles.symbol(token) {
        return Ok(Some(id.to_string()));
    }
    if tiles.get(token).is_some() {
        return Ok(Some(token.to_string()));
    }
    Err(MapError::UnknownTileReference {
        layer: layer.to_string(),
        row,
        token: token.to_string(),
    })
}

fn resolve_row(text: &str, tiles: &TileTable, layer: &str, row: usize) -> Result<Vec<Option<String>>> {
    row_tokens(text)
        .iter()
        .map(|token| resolve_cell(token, tiles, layer, row))
        .collect()
}

fn compile_layer(section: &Section, index: usize, tiles: &TileTable) -> Result<Option<TileLayer>> {
    let mut layer = TileLayer {
        id: section.key.clone(),
        name: section.title.clone(),
        order: index as i32,
        visible: true,
        placement: Some(LayerPlacement::Ground),
        elevation: Some(0.0),
        opacity: None,
        tiles: Vec::new(),
    };
    // `#` is grid data when the map uses it as a tile
    let hash_is_data = tiles.is_bound("#");

    for line in &section.lines {
        let row_number = layer.tiles.len() + 1;

        // a commented-out tail only counts as cells if it reads as a full row
        let raw_row = if hash_is_data && line.code.as_deref() != Some(line.raw.as_str()) {
            resolve_row(&line.raw, tiles, &layer.id, row_number)
                .ok()
                .filter(|row| layer.tiles.first().is_none_or(|first| first.len() == row.len()))
        } else {
            None
        };

        let row = match raw_row {
            Some(row) => row,
            None => {
                let Some(text) = line.code.as_deref() else {
                    continue;
                };
                if layer.tiles.is_empty() {
                    if let Some((key, value)) = property(text) {
                        apply_property(&mut layer, key, value);
                        continue;
                    }
                }
                resolve_row(text, tiles, &layer.id, row_number)?
            }
        };

        if let Some(first) = layer.tiles.first() {
            if first.len() != row.len() {
                return Err(MapError::UnequalLayerWidth {
                    layer: layer.id.clone(),
                    row: row_number,
                    expected: first.len(),
                    found: row.len(),
                });
            }
        }
        layer.tiles.push(row);
    }

    if layer.tiles.is_empty() {
        log::debug!("layer `{}` has no rows, dropped", layer.id);
        return Ok(None);
    }
    Ok(Some(layer))
}

pub fn compile_layers<'s>(
    sections: impl Iterator<Item = &'s Section>,
    tiles: &TileTable,
) -> Result<Vec<TileLayer>> {
    let mut layers = Vec::new();
    for (index, section) in sections.enumerate() {
        if let Some(layer) = compile_layer(section, index, tiles)? {
            log::debug!(
                "layer `{}`: {}x{} cells",
                layer.id,
                layer.width(),
                layer.height()
            );
            layers.push(layer);
        }
    }
    sort_layers(&mut layers);
    Ok(layers)
}

pub fn sort_layers(layers: &mut [TileLayer]) {
    layers.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}
