//! Output model shared by both front ends.
//!
//! Everything in here is plain data; the compiler builds a `MapModel` once
//! and nothing downstream mutates it.

pub mod template;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use template::{
    Appearance, Behaviour, BehaviourSpec, Interaction, InteractionSpec, ObjectTemplate, Vec2,
};

/// Ordered string → JSON bag used for free-form placement data.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Template every synthesized door placement is bound to.
pub const DOOR_TEMPLATE_ID: &str = "community_door";
pub const DEFAULT_BIOME: &str = "Comunidad";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const UNIT: Size = Size {
        width: 1,
        height: 1,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Size::UNIT
    }
}

/// Axis-aligned rectangle in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileTypeDefinition {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub collides: bool,
    pub transparent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TileTypeDefinition {
    /// Fallback tile used when a map ends up with no tile types at all.
    pub fn default_floor() -> Self {
        Self {
            id: "floor".into(),
            symbol: ".".into(),
            name: "Suelo".into(),
            collides: false,
            transparent: true,
            color: Some("#8eb5ff".into()),
            metadata: BTreeMap::from([("default".to_string(), "true".to_string())]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerPlacement {
    Ground,
    Elevated,
    Overlay,
}

impl LayerPlacement {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ground" => Some(LayerPlacement::Ground),
            "elevated" => Some(LayerPlacement::Elevated),
            "overlay" => Some(LayerPlacement::Overlay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    pub id: String,
    pub name: String,
    pub order: i32,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<LayerPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Row-major; every row has the same length.
    pub tiles: Vec<Vec<Option<String>>>,
}

impl TileLayer {
    pub fn width(&self) -> usize {
        self.tiles.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.tiles.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPlacement {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub size: Size,
    pub solid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Appearance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<InteractionSpec>,
}

impl ObjectPlacement {
    /// Template reference: the explicit field first, then `metadata.objectId`.
    pub fn template_ref(&self) -> Option<&str> {
        self.object_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.metadata
                    .get("objectId")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectLayer {
    pub id: String,
    pub name: String,
    pub order: i32,
    pub visible: bool,
    pub objects: Vec<ObjectPlacement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorKind {
    In,
    Out,
}

impl DoorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DoorKind::In => "in",
            DoorKind::Out => "out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Door {
    pub id: String,
    pub kind: DoorKind,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub border_colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soundscape: Option<String>,
}

/// Fully resolved map. Built once by the assembler, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapModel {
    pub id: String,
    pub name: String,
    pub biome: String,
    pub description: String,
    pub size: Size,
    pub spawn: Position,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spawn_points: BTreeMap<String, Position>,
    pub blocked_areas: Vec<Area>,
    pub tile_types: BTreeMap<String, TileTypeDefinition>,
    pub layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
    pub objects: Vec<ObjectPlacement>,
    pub doors: Vec<Door>,
    pub theme: Theme,
    pub collidable_tiles: Vec<Position>,
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: Metadata,
}

impl MapModel {
    pub fn object(&self, id: &str) -> Option<&ObjectPlacement> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn tile_at(&self, layer: &str, x: usize, y: usize) -> Option<&TileTypeDefinition> {
        let layer = self.layers.iter().find(|l| l.id == layer)?;
        let id = layer.tiles.get(y)?.get(x)?.as_deref()?;
        self.tile_types.get(id)
    }
}
