//! Tiled JSON front end.
//!
//! Converts a Tiled export into the same `MapParts` the MDL compiler builds,
//! then runs the shared assembler. Custom data lives in Tiled properties:
//!
//!   • tileset tiles: `phase3:id`, `phase3:collides`, `phase3:transparent`,
//!     `phase3:color`, `phase3:name`, `phase3:options`
//!   • objects:       `objectId`, `solid`, `tile`, `spawnId`
//!   • map:           `id`, `name`, `biome`, `description`, `spawn`,
//!     `spawnPoints` (JSON), `doors` (JSON `{out, in}`), `theme.borderColour`
pub mod tiled;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{MapError, Result};
use crate::model::{
    LayerPlacement, MapModel, Metadata, ObjectLayer, ObjectPlacement, Position, Size, Theme,
    TileLayer, TileTypeDefinition,
};
use crate::processor::assembler::{self, MapParts};
use crate::processor::door_parser::{build_doors, split_door_entries};
use crate::processor::ids::IdRegistry;
use crate::processor::values::{parse_coordinate, value_to_bool};
use crate::processor::{CompileOptions, resolve_map_id};
use tiled::{GID_MASK, TiledLayer, TiledMap, TiledObject, TiledTileset, property_map};

const PHASE3_PREFIX: &str = "phase3:";
const OBJECT_RESERVED: [&str; 4] = ["objectId", "solid", "tile", "spawnId"];
const MAP_RESERVED: [&str; 9] = [
    "id",
    "name",
    "biome",
    "description",
    "spawn",
    "spawnPoints",
    "doors",
    "theme.borderColour",
    "theme.soundscape",
];

/// Parse the raw JSON into the typed Tiled structure.
pub fn parse_tiled_map(json: &str) -> Result<TiledMap> {
    Ok(serde_json::from_str(json)?)
}

/// Imports a map whose tilesets are all embedded.
pub fn import_tiled_str(json: &str, opts: &CompileOptions) -> Result<MapModel> {
    let map = parse_tiled_map(json)?;
    import_tiled(&map, opts)
}

/// Reads a Tiled map from disk, resolving external JSON tilesets relative
/// to the map file.
pub fn load_tiled_map(path: &Path, opts: &CompileOptions) -> Result<MapModel> {
    let json = fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
    let mut map = parse_tiled_map(&json)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    for tileset in &mut map.tilesets {
        let Some(source) = tileset.source.take() else {
            continue;
        };
        let resolved = base_dir.join(&source);
        log::debug!("loading external tileset {}", resolved.display());
        let raw = fs::read_to_string(&resolved).map_err(|e| MapError::io(&resolved, e))?;
        let external: TiledTileset = serde_json::from_str(&raw).map_err(|e| {
            MapError::InvalidTiledMap(format!("tileset `{source}` is not Tiled JSON: {e}"))
        })?;
        // the map's firstgid is authoritative
        tileset.name = external.name.or(tileset.name.take());
        tileset.tiles = external.tiles;
    }

    let mut opts = opts.clone();
    if opts.source_path.is_none() {
        opts.source_path = Some(path.display().to_string());
    }
    import_tiled(&map, &opts)
}

/// Display text of a property value; strings are trimmed, blanks are `None`.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A property that may hold JSON either inline or as an encoded string.
fn json_property(value: Option<&Value>, name: &str) -> Option<Value> {
    match value? {
        Value::String(raw) if raw.trim().is_empty() => None,
        Value::String(raw) => match serde_json::from_str(raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("ignoring `{name}` property, invalid JSON: {e}");
                None
            }
        },
        other => Some(other.clone()),
    }
}

struct TileIndex {
    gids: HashMap<u32, String>,
    types: Vec<TileTypeDefinition>,
}

fn build_tile_index(tilesets: &[TiledTileset]) -> Result<TileIndex> {
    let mut index = TileIndex {
        gids: HashMap::new(),
        types: Vec::new(),
    };

    for tileset in tilesets {
        if let Some(source) = &tileset.source {
            return Err(MapError::InvalidTiledMap(format!(
                "external tileset `{source}` must be resolved by loading the map from a file"
            )));
        }
        for tile in &tileset.tiles {
            let gid = tileset.firstgid.checked_add(tile.id).ok_or_else(|| {
                MapError::InvalidTiledMap(format!(
                    "tile {} with firstgid {} overflows the gid range",
                    tile.id, tileset.firstgid
                ))
            })?;
            let props = property_map(&tile.properties);
            let tile_id = text(props.get("phase3:id"))
                .or_else(|| tile.kind.clone().or_else(|| tile.class.clone()))
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| {
                    format!("{}-{}", tileset.name.as_deref().unwrap_or("tile"), tile.id)
                });

            let mut metadata = BTreeMap::new();
            for (key, value) in &props {
                let key = key.strip_prefix(PHASE3_PREFIX).unwrap_or(key);
                if matches!(key, "id" | "collides" | "transparent" | "color" | "name") {
                    continue;
                }
                if let Some(value) = text(Some(value)) {
                    metadata.insert(key.to_string(), value);
                }
            }

            let symbol = metadata
                .get("symbol")
                .and_then(|s| s.chars().next())
                .or_else(|| tile_id.chars().next())
                .unwrap_or('?')
                .to_string();

            let def = TileTypeDefinition {
                symbol,
                name: text(props.get("phase3:name"))
                    .or_else(|| text(props.get("name")))
                    .unwrap_or_else(|| tile_id.clone()),
                collides: props
                    .get("phase3:collides")
                    .and_then(value_to_bool)
                    .unwrap_or(false),
                transparent: props
                    .get("phase3:transparent")
                    .and_then(value_to_bool)
                    .unwrap_or(true),
                color: text(props.get("phase3:color")),
                metadata,
                id: tile_id.clone(),
            };
            match index.types.iter_mut().find(|t| t.id == def.id) {
                Some(slot) => *slot = def,
                None => index.types.push(def),
            }
            index.gids.insert(gid, tile_id);
        }
    }

    if !index.types.iter().any(|t| t.id == "floor") {
        index.types.push(TileTypeDefinition::default_floor());
    }
    Ok(index)
}

/// Group layers are replaced by their children, inheriting visibility and
/// opacity.
fn flatten_layers(layers: &[TiledLayer], visible: bool, opacity: f64, out: &mut Vec<TiledLayer>) {
    for layer in layers {
        let own_visible = visible && layer.visible.unwrap_or(true);
        let own_opacity = layer.opacity.map(|o| o * opacity);
        if layer.kind == "group" {
            flatten_layers(&layer.layers, own_visible, own_opacity.unwrap_or(opacity), out);
            continue;
        }
        let mut flat = layer.clone();
        flat.visible = Some(own_visible);
        flat.opacity = own_opacity.or((opacity < 1.0).then_some(opacity));
        out.push(flat);
    }
}

fn layer_id(layer: &TiledLayer, index: usize) -> String {
    match &layer.id {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => layer
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("layer-{}", index + 1)),
    }
}

fn layer_name(layer: &TiledLayer, id: &str) -> String {
    layer
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(id)
        .to_string()
}

fn layer_order(props: &Metadata, fallback: usize) -> i32 {
    props
        .get("phase3:order")
        .and_then(|v| v.as_i64().or_else(|| v.as_str()?.trim().parse().ok()))
        .map_or(fallback as i32, |o| o as i32)
}

fn gid_rows(
    layer: &TiledLayer,
    width: u32,
    height: u32,
    gids: &HashMap<u32, String>,
    id: &str,
) -> Result<Vec<Vec<Option<String>>>> {
    if let Some(encoding) = layer.encoding.as_deref().filter(|e| *e != "csv") {
        return Err(MapError::InvalidTiledMap(format!(
            "layer `{id}` uses `{encoding}` encoding; export with CSV/array data"
        )));
    }
    let data: &[Value] = match &layer.data {
        None => &[],
        Some(Value::Array(values)) => values,
        Some(_) => {
            return Err(MapError::InvalidTiledMap(format!(
                "layer `{id}` data is not a gid array"
            )));
        }
    };

    let mut rows = Vec::with_capacity(height as usize);
    for y in 0..height as usize {
        let mut row = Vec::with_capacity(width as usize);
        for x in 0..width as usize {
            let raw = data
                .get(y * width as usize + x)
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            let gid = raw & GID_MASK;
            let cell = if gid == 0 {
                None
            } else {
                let tile = gids.get(&gid).cloned();
                if tile.is_none() {
                    log::warn!("layer `{id}`: gid {gid} at {x},{y} has no tile definition");
                }
                tile
            };
            row.push(cell);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn tile_layer(
    layer: &TiledLayer,
    index: usize,
    map: &TiledMap,
    gids: &HashMap<u32, String>,
) -> Result<TileLayer> {
    let props = property_map(&layer.properties);
    let id = layer_id(layer, index);
    let width = layer.width.unwrap_or(map.width);
    let height = layer.height.unwrap_or(map.height);
    assembler::check_size(Size::new(width, height))?;
    Ok(TileLayer {
        name: layer_name(layer, &id),
        order: layer_order(&props, index),
        visible: layer.visible.unwrap_or(true),
        placement: text(props.get("phase3:placement")).and_then(|p| LayerPlacement::parse(&p)),
        elevation: props.get("phase3:elevation").and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str()?.trim().parse().ok())
                .map(|e| e as f32)
        }),
        opacity: layer.opacity.map(|o| o.clamp(0.0, 1.0) as f32),
        tiles: gid_rows(layer, width, height, gids, &id)?,
        id,
    })
}

struct ObjectContext<'a> {
    tile_width: f64,
    tile_height: f64,
    ids: &'a mut IdRegistry,
    spawns: &'a mut BTreeMap<String, Position>,
}

fn tiled_object(object: &TiledObject, ctx: &mut ObjectContext<'_>) -> ObjectPlacement {
    let props = property_map(&object.properties);
    let solid = props.get("solid").and_then(value_to_bool).unwrap_or(false);
    let template = text(props.get("objectId"))
        .or_else(|| object.kind.clone().or_else(|| object.class.clone()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let position = text(props.get("tile"))
        .and_then(|t| parse_coordinate(&t))
        .unwrap_or_else(|| {
            Position::new(
                (object.x / ctx.tile_width).round() as i32,
                (object.y / ctx.tile_height).round() as i32,
            )
        });

    let given_name = object
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let base = given_name
        .map(str::to_string)
        .or_else(|| object.id.map(|id| format!("object-{id}")))
        .unwrap_or_else(|| "object".to_string());
    let id = ctx.ids.allocate(&base);

    if let Some(spawn_id) = text(props.get("spawnId")) {
        ctx.spawns.insert(spawn_id, position);
    }

    let mut metadata = Metadata::new();
    if let Some(template) = &template {
        metadata.insert("objectId".into(), Value::String(template.clone()));
    }
    for (key, value) in props {
        if !OBJECT_RESERVED.contains(&key.as_str()) {
            metadata.insert(key, value);
        }
    }

    ObjectPlacement {
        name: given_name.map_or_else(|| id.clone(), str::to_string),
        id,
        position,
        size: Size::UNIT,
        solid,
        object_id: template,
        metadata,
        appearance: None,
        interaction: None,
    }
}

fn door_list(doors: Option<&Value>, key: &str) -> Vec<String> {
    match doors.and_then(|d| d.get(key)) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split_door_entries)
            .collect(),
        Some(Value::String(raw)) => split_door_entries(raw),
        _ => Vec::new(),
    }
}

fn spawn_point(value: &Value) -> Option<Position> {
    match value {
        Value::String(raw) => parse_coordinate(raw),
        Value::Object(obj) => Some(Position::new(
            obj.get("x")?.as_i64()? as i32,
            obj.get("y")?.as_i64()? as i32,
        )),
        _ => None,
    }
}

pub fn import_tiled(map: &TiledMap, opts: &CompileOptions) -> Result<MapModel> {
    let props = property_map(&map.properties);
    let index = build_tile_index(&map.tilesets)?;

    let mut flat = Vec::new();
    flatten_layers(&map.layers, true, 1.0, &mut flat);

    let map_id = resolve_map_id(text(props.get("id")).as_deref(), opts.source_path.as_deref());
    let mut ids = IdRegistry::new();
    let mut spawns = BTreeMap::new();
    let mut ctx = ObjectContext {
        tile_width: map.tile_width(),
        tile_height: map.tile_height(),
        ids: &mut ids,
        spawns: &mut spawns,
    };

    let mut layers = Vec::new();
    let mut object_layers = Vec::new();
    let mut objects = Vec::new();
    for (i, layer) in flat.iter().enumerate() {
        match layer.kind.as_str() {
            "tilelayer" => layers.push(tile_layer(layer, i, map, &index.gids)?),
            "objectgroup" => {
                let layer_props = property_map(&layer.properties);
                let placements: Vec<ObjectPlacement> =
                    layer.objects.iter().map(|o| tiled_object(o, &mut ctx)).collect();
                objects.extend(placements.iter().cloned());
                let id = layer_id(layer, i);
                object_layers.push(ObjectLayer {
                    name: layer_name(layer, &id),
                    order: layer_order(&layer_props, i),
                    visible: layer.visible.unwrap_or(true),
                    objects: placements,
                    id,
                });
            }
            other => log::debug!("skipping Tiled layer of type `{other}`"),
        }
    }

    // ── Doors: allocated after the placements ─────────────────────────
    let doors_json = json_property(props.get("doors"), "doors");
    let (doors, door_objects) = build_doors(
        &door_list(doors_json.as_ref(), "out"),
        &door_list(doors_json.as_ref(), "in"),
        &map_id,
        &mut ids,
    )?;
    objects.extend(door_objects);

    let mut spawn_points = BTreeMap::new();
    if let Some(Value::Object(points)) = json_property(props.get("spawnPoints"), "spawnPoints") {
        for (name, value) in &points {
            match spawn_point(value) {
                Some(p) => {
                    spawn_points.insert(name.clone(), p);
                }
                None => log::warn!("spawn point `{name}` is not a coordinate"),
            }
        }
    }
    for (name, position) in spawns {
        spawn_points.entry(name).or_insert(position);
    }

    let extra: Metadata = props
        .iter()
        .filter(|(k, _)| !MAP_RESERVED.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    log::debug!(
        "Tiled map `{map_id}`: {} tile layers, {} object layers, {} tile types",
        layers.len(),
        object_layers.len(),
        index.types.len()
    );

    assembler::assemble(MapParts {
        name: text(props.get("name")),
        biome: text(props.get("biome")),
        description: text(props.get("description")),
        size: (map.width > 0 && map.height > 0).then(|| Size::new(map.width, map.height)),
        spawn: text(props.get("spawn")).and_then(|s| parse_coordinate(&s)),
        spawn_points,
        tile_types: index.types,
        layers,
        object_layers,
        objects,
        doors,
        theme: Theme {
            border_colour: text(props.get("theme.borderColour")),
            soundscape: text(props.get("theme.soundscape")),
        },
        source_path: opts.source_path.clone(),
        extra,
        id: map_id,
    })
}
