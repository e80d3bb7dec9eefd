//! The MDL compiler: plaintext map definition in, `MapModel` out.
//!
//! Each stage is a pure function returning `Result`; the first error aborts
//! the whole compile.
pub mod assembler;
pub mod door_parser;
pub mod ids;
pub mod layer_parser;
pub mod lexer;
pub mod object_parser;
pub mod tile_parser;
pub mod values;

use std::path::Path;

use crate::error::Result;
use crate::model::{MapModel, Theme};
use assembler::MapParts;
use ids::IdRegistry;
use tile_parser::TileCatalog;
use values::{MetaTable, parse_coordinate, parse_dimensions};

const FALLBACK_MAP_ID: &str = "map";

/// Meta keys with a dedicated meaning; anything else lands in `extra`.
const KNOWN_META_KEYS: &[&str] = &[
    "id",
    "title",
    "name",
    "biome",
    "description",
    "dimensions",
    "size",
    "startingPoint",
    "spawnPoint",
    "spawn",
    "doorPosition",
    "doorIn",
    "doorOut",
    "borderColour",
    "borderColor",
    "soundscape",
    "floorColour",
    "floorColor",
];

/// Per-call inputs. There is no global state; two compiles with equal
/// options and text give equal models.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub catalog: TileCatalog,
    /// Used for the fallback map id and echoed into the model.
    pub source_path: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            catalog: TileCatalog::builtin(),
            source_path: None,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_catalog(mut self, catalog: TileCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

fn file_stem(source_path: Option<&str>) -> Option<String> {
    let stem = Path::new(source_path?).file_stem()?.to_str()?.trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// `id` meta, else the source file stem, else `map`.
pub(crate) fn resolve_map_id(explicit: Option<&str>, source_path: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| file_stem(source_path))
        .unwrap_or_else(|| FALLBACK_MAP_ID.to_string())
}

pub fn compile_mdl(src: &str, opts: &CompileOptions) -> Result<MapModel> {
    // 1. ── Sections & meta ───────────────────────────────────────────
    let sections = lexer::split_sections(src);
    let meta = MetaTable::from_section(sections.get(lexer::META_SECTION));

    // 2. ── Tiles ─────────────────────────────────────────────────────
    let tiles = tile_parser::resolve_tiles(
        &opts.catalog,
        sections.get("tiles"),
        meta.get(&["floorColour", "floorColor"]),
    )?;

    // 3. ── Layers ────────────────────────────────────────────────────
    let layers = layer_parser::compile_layers(sections.with_prefix("layer"), &tiles)?;

    // 4. ── Doors, then objects, sharing one id registry ──────────────
    let map_id = resolve_map_id(meta.get(&["id"]), opts.source_path.as_deref());
    let mut ids = IdRegistry::new();
    let out_entries =
        door_parser::outbound_entries(meta.get(&["doorOut"]), meta.get(&["doorPosition"]));
    let in_entries = meta
        .get(&["doorIn"])
        .map(door_parser::split_door_entries)
        .unwrap_or_default();
    let (doors, mut objects) = door_parser::build_doors(&out_entries, &in_entries, &map_id, &mut ids)?;

    let object_layers =
        object_parser::compile_object_layers(sections.with_prefix("objects"), &mut ids)?;
    objects.extend(object_layers.iter().flat_map(|l| l.objects.iter().cloned()));

    // 5. ── Assemble ──────────────────────────────────────────────────
    let size = meta.get(&["dimensions", "size"]).and_then(|raw| {
        let parsed = parse_dimensions(raw);
        if parsed.is_none() {
            log::warn!("map `{map_id}`: ignoring invalid dimensions `{raw}`");
        }
        parsed
    });
    let spawn = ["startingPoint", "spawnPoint", "spawn"]
        .iter()
        .find_map(|key| meta.get(&[*key]).and_then(parse_coordinate));

    assembler::assemble(MapParts {
        name: meta.get(&["title", "name"]).map(str::to_string),
        biome: meta.get(&["biome"]).map(str::to_string),
        description: meta.get(&["description"]).map(str::to_string),
        size,
        spawn,
        spawn_points: Default::default(),
        tile_types: tiles.into_types(),
        layers,
        object_layers,
        objects,
        doors,
        theme: Theme {
            border_colour: meta.get(&["borderColour", "borderColor"]).map(str::to_string),
            soundscape: meta.get(&["soundscape"]).map(str::to_string),
        },
        source_path: opts.source_path.clone(),
        extra: meta.extra(KNOWN_META_KEYS),
        id: map_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;
    use crate::model::{DoorKind, Position, Size};
    use serde_json::json;

    const TEST_ROOM: &str = "\
[Meta]
id: test_room
dimensions: 3x3
doorOut: 1x0->lobby@2x2

[Tiles]
. = floor
# = wall;collides=true

[Layer]
. . .
. # .
. . .

[Objects]
lamp@1x1
";

    #[test]
    fn test_room_example() {
        let map = compile_mdl(TEST_ROOM, &CompileOptions::new()).expect("compile");
        assert_eq!(map.id, "test_room");
        assert_eq!(map.size, Size::new(3, 3));
        assert_eq!(map.spawn, Position::new(1, 1));
        assert_eq!(map.collidable_tiles, vec![Position::new(1, 1)]);

        let lamp = map.object("lamp").expect("lamp");
        assert!(!lamp.solid);
        assert_eq!(lamp.position, Position::new(1, 1));

        assert_eq!(map.doors.len(), 1);
        let door = &map.doors[0];
        assert_eq!(door.kind, DoorKind::Out);
        assert_eq!(door.position, Position::new(1, 0));
        assert_eq!(door.target_map.as_deref(), Some("lobby"));
        assert_eq!(door.target_position, Some(Position::new(2, 2)));

        let door_object = map.object(&door.id).expect("door placement");
        assert!(!door_object.solid);
        assert_eq!(door_object.position, Position::new(1, 0));
        assert_eq!(door_object.metadata["targetMap"], "lobby");
        assert_eq!(door_object.metadata["targetPosition"], json!({ "x": 2, "y": 2 }));
        // doors come first in the flat list
        assert_eq!(map.objects[0].id, door.id);
    }

    #[test]
    fn test_conflicting_symbol_aborts() {
        let err = compile_mdl("[Tiles]\n. = floor\n. = wall\n", &CompileOptions::new()).unwrap_err();
        assert!(matches!(err, MapError::ConflictingSymbol { .. }), "got {err:?}");
    }

    #[test]
    fn test_reparse_is_deterministic() {
        let opts = CompileOptions::new();
        let a = compile_mdl(TEST_ROOM, &opts).expect("first");
        let b = compile_mdl(TEST_ROOM, &opts).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_id_and_title_fallbacks() {
        let opts = CompileOptions::new().with_source_path("maps/forest_edge.map");
        let map = compile_mdl("name: Linde del bosque\n", &opts).expect("compile");
        assert_eq!(map.id, "forest_edge");
        assert_eq!(map.name, "Linde del bosque");

        let map = compile_mdl("", &CompileOptions::new()).expect("compile");
        assert_eq!(map.id, "map");
        assert_eq!(map.name, "map");
    }

    #[test]
    fn test_meta_extras_and_theme() {
        let src = "id: x\nBorder Colour: #123456\nsoundscape: birds\nMood Level: calm\n";
        let map = compile_mdl(src, &CompileOptions::new()).expect("compile");
        assert_eq!(map.theme.border_colour.as_deref(), Some("#123456"));
        assert_eq!(map.theme.soundscape.as_deref(), Some("birds"));
        assert_eq!(map.extra.get("moodLevel"), Some(&json!("calm")));
        assert!(!map.extra.contains_key("id"));
    }

    #[test]
    fn test_spawn_precedence() {
        let src = "dimensions: 9x9\nspawn: 2x2\nspawnPoint: 3x3\n";
        let map = compile_mdl(src, &CompileOptions::new()).expect("compile");
        assert_eq!(map.spawn, Position::new(3, 3));
    }

    #[test]
    fn test_objects_never_collide_with_door_ids() {
        let src = "id: hall\ndoorOut: 0x0\n[Objects]\nhall-door-out@1x1\n";
        let map = compile_mdl(src, &CompileOptions::new()).expect("compile");
        let ids: Vec<_> = map.objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["hall-door-out", "hall-door-out-2"]);
    }
}
