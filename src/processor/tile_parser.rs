//! Builds the symbol → tile id and tile id → definition tables.
//!
//! Grammar of one `[Tiles]` line:
//!
//! ```text
//! SYMBOL = tileId[;key=value|flag]*
//! ```

use std::collections::{BTreeMap, HashMap};

use super::lexer::{Line, Section};
use super::values::{compact_key, parse_bool};
use crate::error::{MapError, Result};
use crate::model::TileTypeDefinition;

/// Tile types every map can use without declaring them.
#[derive(Debug, Clone, Default)]
pub struct TileCatalog {
    tiles: Vec<TileTypeDefinition>,
}

impl TileCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tiles(tiles: Vec<TileTypeDefinition>) -> Self {
        Self { tiles }
    }

    pub fn builtin() -> Self {
        let tile = |id: &str, symbol: &str, name: &str, collides: bool, transparent: bool, color: &str| {
            TileTypeDefinition {
                id: id.into(),
                symbol: symbol.into(),
                name: name.into(),
                collides,
                transparent,
                color: Some(color.into()),
                metadata: BTreeMap::new(),
            }
        };
        Self::from_tiles(vec![
            TileTypeDefinition::default_floor(),
            tile("wall", "#", "Muro", true, false, "#4b4f5c"),
            tile("water", "~", "Agua", true, true, "#3d7fd9"),
            tile("grass", ",", "Césped", false, true, "#5fa35a"),
        ])
    }

    pub fn tiles(&self) -> &[TileTypeDefinition] {
        &self.tiles
    }
}

/// Resolved tile tables for one map.
#[derive(Debug, Clone)]
pub struct TileTable {
    /// Declaration order: catalog first, then map additions.
    types: Vec<TileTypeDefinition>,
    symbols: HashMap<String, String>,
}

impl TileTable {
    pub fn symbol(&self, symbol: &str) -> Option<&str> {
        self.symbols.get(symbol).map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&TileTypeDefinition> {
        self.types.iter().find(|t| t.id == id)
    }

    /// True when `token` names a symbol or a tile id.
    pub fn is_bound(&self, token: &str) -> bool {
        self.symbols.contains_key(token) || self.get(token).is_some()
    }

    pub fn first_id(&self) -> Option<&str> {
        self.types.first().map(|t| t.id.as_str())
    }

    pub fn into_types(self) -> Vec<TileTypeDefinition> {
        self.types
    }

    fn upsert(&mut self, def: TileTypeDefinition) {
        match self.types.iter_mut().find(|t| t.id == def.id) {
            Some(slot) => *slot = def,
            None => self.types.push(def),
        }
    }
}

pub fn is_default_floor(tile: &TileTypeDefinition) -> bool {
    tile.id == "floor"
        || tile.symbol == "."
        || tile
            .metadata
            .get("default")
            .and_then(|v| parse_bool(v))
            .unwrap_or(false)
}

/// `# = wall` looks like a comment to the splitter; reclaim it here.
fn definition_text(line: &Line) -> Option<&str> {
    let after_hash = line.raw.strip_prefix('#');
    if after_hash.is_some_and(|rest| rest.trim_start().starts_with('=')) {
        return Some(line.without_trailing_comment());
    }
    line.code.as_deref()
}

pub fn resolve_tiles(
    catalog: &TileCatalog,
    section: Option<&Section>,
    floor_colour: Option<&str>,
) -> Result<TileTable> {
    let mut table = TileTable {
        types: catalog.tiles().to_vec(),
        symbols: catalog
            .tiles()
            .iter()
            .map(|t| (t.symbol.clone(), t.id.clone()))
            .collect(),
    };
    // bindings made by this map; only these can conflict
    let mut bound_here: HashMap<String, String> = HashMap::new();

    for line in section.into_iter().flat_map(|s| s.lines.iter()) {
        let Some(text) = definition_text(line) else {
            continue;
        };
        let malformed = || MapError::MalformedTileDefinition {
            line: line.number,
            content: text.to_string(),
        };

        let (symbol, rest) = text.split_once('=').ok_or_else(malformed)?;
        let symbol = symbol.trim();
        let mut tokens = rest.split(';');
        let tile_id = tokens.next().map(str::trim).unwrap_or_default();
        if symbol.is_empty() || tile_id.is_empty() {
            return Err(malformed());
        }

        if let Some(existing) = bound_here.get(symbol) {
            if existing != tile_id {
                return Err(MapError::ConflictingSymbol {
                    symbol: symbol.to_string(),
                    existing: existing.clone(),
                    requested: tile_id.to_string(),
                });
            }
        }

        let mut def = table.get(tile_id).cloned().unwrap_or_else(|| TileTypeDefinition {
            id: tile_id.to_string(),
            symbol: symbol.to_string(),
            name: tile_id.to_string(),
            collides: false,
            transparent: true,
            color: None,
            metadata: BTreeMap::new(),
        });
        def.symbol = symbol.to_string();

        for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (token, "true"),
            };
            let set_bool = |slot: &mut bool| match parse_bool(value) {
                Some(b) => *slot = b,
                None => log::warn!(
                    "line {}: `{key}={value}` is not a boolean, keeping {}",
                    line.number,
                    slot
                ),
            };
            match compact_key(key).as_str() {
                "name" | "label" => def.name = value.to_string(),
                "collides" | "solid" | "collision" => set_bool(&mut def.collides),
                "transparent" => set_bool(&mut def.transparent),
                "color" | "colour" => def.color = Some(value.to_string()),
                _ => {
                    def.metadata.insert(key.to_string(), value.to_string());
                }
            }
        }

        if let Some(previous) = table.symbols.get(symbol) {
            if previous != tile_id && !bound_here.contains_key(symbol) {
                log::debug!("symbol `{symbol}` rebound from base tile `{previous}` to `{tile_id}`");
            }
        }
        table.symbols.insert(symbol.to_string(), tile_id.to_string());
        bound_here.insert(symbol.to_string(), tile_id.to_string());
        table.upsert(def);
    }

    if let Some(colour) = floor_colour {
        for tile in table.types.iter_mut().filter(|t| is_default_floor(t)) {
            tile.color = Some(colour.to_string());
        }
    }

    if table.types.is_empty() {
        let floor = TileTypeDefinition::default_floor();
        table.symbols.insert(floor.symbol.clone(), floor.id.clone());
        table.types.push(floor);
    }

    log::debug!(
        "resolved {} tile types, {} symbols",
        table.types.len(),
        table.symbols.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::lexer::split_sections;

    fn tiles(src: &str, catalog: &TileCatalog) -> Result<TileTable> {
        let sections = split_sections(src);
        resolve_tiles(catalog, sections.get("tiles"), None)
    }

    #[test]
    fn test_symbols_and_flags() {
        let table = tiles(
            "[Tiles]\n. = floor\n# = wall;collides=true\nT = tree;solid;label=Pino;season=winter\n",
            &TileCatalog::empty(),
        )
        .expect("tiles");
        assert_eq!(table.symbol("#"), Some("wall"));
        assert!(table.get("wall").unwrap().collides);
        let tree = table.get("tree").unwrap();
        assert!(tree.collides);
        assert!(tree.transparent);
        assert_eq!(tree.name, "Pino");
        assert_eq!(tree.metadata.get("season").map(String::as_str), Some("winter"));
    }

    #[test]
    fn test_rebinding_symbol_is_an_error() {
        let err = tiles("[Tiles]\n. = floor\n. = wall\n", &TileCatalog::empty()).unwrap_err();
        assert!(
            matches!(err, MapError::ConflictingSymbol { ref symbol, .. } if symbol == "."),
            "got {err:?}"
        );
    }

    #[test]
    fn test_base_symbols_can_be_rebound() {
        let table = tiles("[Tiles]\n# = hedge;collides\n", &TileCatalog::builtin()).expect("tiles");
        assert_eq!(table.symbol("#"), Some("hedge"));
        // the catalog wall is still addressable by id
        assert!(table.get("wall").is_some());
    }

    #[test]
    fn test_override_inherits_and_merges_metadata() {
        let catalog = TileCatalog::from_tiles(vec![TileTypeDefinition {
            id: "wall".into(),
            symbol: "W".into(),
            name: "Muro".into(),
            collides: true,
            transparent: false,
            color: Some("#111".into()),
            metadata: BTreeMap::from([("material".to_string(), "stone".to_string())]),
        }]);
        let table = tiles("[Tiles]\nW = wall;colour=#222;height=2\n", &catalog).expect("tiles");
        let wall = table.get("wall").unwrap();
        assert!(wall.collides);
        assert!(!wall.transparent);
        assert_eq!(wall.name, "Muro");
        assert_eq!(wall.color.as_deref(), Some("#222"));
        assert_eq!(wall.metadata.len(), 2);
    }

    #[test]
    fn test_floor_colour_override() {
        let sections = split_sections("[Tiles]\n_ = sand;default=yes\nW = wall\n");
        let table = resolve_tiles(&TileCatalog::builtin(), sections.get("tiles"), Some("#abcdef"))
            .expect("tiles");
        assert_eq!(table.get("floor").unwrap().color.as_deref(), Some("#abcdef"));
        assert_eq!(table.get("sand").unwrap().color.as_deref(), Some("#abcdef"));
        assert_ne!(table.get("wall").unwrap().color.as_deref(), Some("#abcdef"));
    }

    #[test]
    fn test_empty_table_gets_default_floor() {
        let table = tiles("", &TileCatalog::empty()).expect("tiles");
        assert_eq!(table.first_id(), Some("floor"));
        assert_eq!(table.symbol("."), Some("floor"));
    }

    #[test]
    fn test_malformed_line() {
        let err = tiles("[Tiles]\njust words\n", &TileCatalog::empty()).unwrap_err();
        assert!(matches!(err, MapError::MalformedTileDefinition { line: 2, .. }), "got {err:?}");
    }
}
