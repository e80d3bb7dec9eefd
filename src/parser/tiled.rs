//! Serde mirror of the parts of a Tiled JSON export we read.
//!
//! Only fields the importer needs are modelled; everything is defaulted so
//! older and newer Tiled versions both deserialize.

use serde::Deserialize;
use serde_json::Value;

use crate::model::Metadata;

/// Tiled stores flip flags in the top bits of each gid.
pub const GID_MASK: u32 = 0x0fff_ffff;
pub const DEFAULT_TILE_SIZE: f64 = 64.0;

#[derive(Debug, Clone, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Property list → ordered name/value map; later duplicates win.
pub fn property_map(properties: &[TiledProperty]) -> Metadata {
    properties
        .iter()
        .map(|p| (p.name.clone(), p.value.clone()))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledMap {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub tilewidth: Option<f64>,
    #[serde(default)]
    pub tileheight: Option<f64>,
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

impl TiledMap {
    pub fn tile_width(&self) -> f64 {
        self.tilewidth.filter(|w| *w > 0.0).unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn tile_height(&self) -> f64 {
        self.tileheight.filter(|h| *h > 0.0).unwrap_or(DEFAULT_TILE_SIZE)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledLayer {
    /// Integer in current exports; kept loose for hand-written files.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Gid array; encoded (base64) data is rejected by the importer.
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub objects: Vec<TiledObject>,
    /// Children of a `group` layer.
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledObject {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Tiled ≥ 1.9 spelling of `type`.
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTileset {
    #[serde(default = "first_gid")]
    pub firstgid: u32,
    /// External tileset file, relative to the map.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tiles: Vec<TiledTile>,
}

fn first_gid() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTile {
    pub id: u32,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}
