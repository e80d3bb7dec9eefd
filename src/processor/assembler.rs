//! Final derivation pass shared by the MDL and Tiled front ends.
//!
//! Front ends hand over a [`MapParts`]; everything derivable (size, spawn,
//! border bands, collision index, ordering) is computed here so both paths
//! agree on it.

use std::collections::{BTreeMap, BTreeSet};

use super::layer_parser::sort_layers;
use crate::error::{MapError, Result};
use crate::model::{
    Area, DEFAULT_BIOME, Door, LayerPlacement, MapModel, Metadata, ObjectLayer, ObjectPlacement,
    Position, Size, Theme, TileLayer, TileTypeDefinition,
};

/// Everything a front end extracted, before derivation.
#[derive(Debug, Clone, Default)]
pub struct MapParts {
    pub id: String,
    pub name: Option<String>,
    pub biome: Option<String>,
    pub description: Option<String>,
    /// Explicit size; derived from the layers when absent.
    pub size: Option<Size>,
    pub spawn: Option<Position>,
    pub spawn_points: BTreeMap<String, Position>,
    /// Declaration order; the first one fills a synthesized ground layer.
    pub tile_types: Vec<TileTypeDefinition>,
    pub layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
    /// Flat list, already in output order.
    pub objects: Vec<ObjectPlacement>,
    pub doors: Vec<Door>,
    pub theme: Theme,
    pub source_path: Option<String>,
    pub extra: Metadata,
}

/// Upper bound on `width * height` for any map.
pub const MAX_MAP_CELLS: u64 = 1 << 24;

pub fn check_size(size: Size) -> Result<()> {
    if u64::from(size.width) * u64::from(size.height) > MAX_MAP_CELLS {
        return Err(MapError::MapTooLarge {
            width: size.width,
            height: size.height,
            max: MAX_MAP_CELLS,
        });
    }
    Ok(())
}

/// Four unit-thick bands along the edges: top, bottom, left, right.
pub fn blocked_areas(size: Size) -> Vec<Area> {
    let Size { width, height } = size;
    if width == 0 || height == 0 {
        return Vec::new();
    }
    vec![
        Area { x: 0, y: 0, width, height: 1 },
        Area { x: 0, y: height - 1, width, height: 1 },
        Area { x: 0, y: 0, width: 1, height },
        Area { x: width - 1, y: 0, width: 1, height },
    ]
}

fn layer_bounds(layers: &[TileLayer]) -> Option<Size> {
    let width = layers.iter().map(TileLayer::width).max()?;
    let height = layers.iter().map(TileLayer::height).max()?;
    (width > 0 && height > 0).then(|| Size::new(width as u32, height as u32))
}

fn ground_layer(size: Size, tile: Option<&str>) -> TileLayer {
    let row = vec![tile.map(str::to_string); size.width as usize];
    TileLayer {
        id: "ground".into(),
        name: "Ground".into(),
        order: 0,
        visible: true,
        placement: Some(LayerPlacement::Ground),
        elevation: Some(0.0),
        opacity: None,
        tiles: vec![row; size.height as usize],
    }
}

/// Every cell whose tile collides, deduplicated and ordered by (y, x).
pub fn collidable_tiles(
    layers: &[TileLayer],
    tile_types: &BTreeMap<String, TileTypeDefinition>,
) -> Vec<Position> {
    let mut cells = BTreeSet::new();
    for layer in layers {
        for (y, row) in layer.tiles.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let collides = cell
                    .as_deref()
                    .and_then(|id| tile_types.get(id))
                    .is_some_and(|t| t.collides);
                if collides {
                    cells.insert((y as i32, x as i32));
                }
            }
        }
    }
    cells.into_iter().map(|(y, x)| Position::new(x, y)).collect()
}

pub fn assemble(parts: MapParts) -> Result<MapModel> {
    let MapParts {
        id,
        name,
        biome,
        description,
        size,
        spawn,
        spawn_points,
        mut tile_types,
        mut layers,
        mut object_layers,
        objects,
        doors,
        theme,
        source_path,
        extra,
    } = parts;

    if tile_types.is_empty() {
        tile_types.push(TileTypeDefinition::default_floor());
    }

    let size = size
        .or_else(|| layer_bounds(&layers))
        .unwrap_or(Size::UNIT);
    check_size(size)?;

    if layers.is_empty() {
        let first = tile_types.first().map(|t| t.id.as_str());
        log::debug!("map `{id}` has no tile layers, filling ground with {first:?}");
        layers.push(ground_layer(size, first));
    }
    sort_layers(&mut layers);
    object_layers.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    let spawn = spawn.unwrap_or_else(|| {
        Position::new((size.width / 2) as i32, (size.height / 2) as i32)
    });

    let tile_types: BTreeMap<String, TileTypeDefinition> =
        tile_types.into_iter().map(|t| (t.id.clone(), t)).collect();
    let collidable_tiles = collidable_tiles(&layers, &tile_types);

    let model = MapModel {
        name: name.unwrap_or_else(|| id.clone()),
        biome: biome.unwrap_or_else(|| DEFAULT_BIOME.to_string()),
        description: description.unwrap_or_default(),
        blocked_areas: blocked_areas(size),
        size,
        spawn,
        spawn_points,
        tile_types,
        layers,
        object_layers,
        objects,
        doors,
        theme,
        collidable_tiles,
        source_path,
        extra,
        id,
    };
    log::info!(
        "assembled map `{}`: {}x{}, {} layers, {} objects, {} doors",
        model.id,
        model.size.width,
        model.size.height,
        model.layers.len(),
        model.objects.len(),
        model.doors.len()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, collides: bool) -> TileTypeDefinition {
        TileTypeDefinition {
            id: id.into(),
            symbol: id[..1].into(),
            name: id.into(),
            collides,
            transparent: !collides,
            color: None,
            metadata: BTreeMap::new(),
        }
    }

    fn layer(id: &str, order: i32, rows: &[&[Option<&str>]]) -> TileLayer {
        TileLayer {
            id: id.into(),
            name: id.into(),
            order,
            visible: true,
            placement: None,
            elevation: None,
            opacity: None,
            tiles: rows
                .iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_border_bands() {
        let areas = blocked_areas(Size::new(4, 3));
        assert_eq!(
            areas,
            vec![
                Area { x: 0, y: 0, width: 4, height: 1 },
                Area { x: 0, y: 2, width: 4, height: 1 },
                Area { x: 0, y: 0, width: 1, height: 3 },
                Area { x: 3, y: 0, width: 1, height: 3 },
            ]
        );
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let err = assemble(MapParts {
            id: "endless".into(),
            size: Some(Size::new(100_000, 100_000)),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, MapError::MapTooLarge { width: 100_000, .. }), "got {err:?}");
        assert!(check_size(Size::new(4096, 4096)).is_ok());
    }

    #[test]
    fn test_size_and_spawn_derived_from_layers() {
        let model = assemble(MapParts {
            id: "cave".into(),
            tile_types: vec![tile("floor", false)],
            layers: vec![
                layer("a", 0, &[&[Some("floor"), Some("floor")]]),
                layer("b", 1, &[&[None], &[None], &[None]]),
            ],
            ..Default::default()
        })
        .expect("assemble");
        assert_eq!(model.size, Size::new(2, 3));
        assert_eq!(model.spawn, Position::new(1, 1));
        assert_eq!(model.name, "cave");
        assert_eq!(model.biome, DEFAULT_BIOME);
    }

    #[test]
    fn test_collidable_tiles_are_deduplicated_and_sorted() {
        let model = assemble(MapParts {
            id: "m".into(),
            tile_types: vec![tile("floor", false), tile("wall", true)],
            layers: vec![
                layer("top", 1, &[&[None, Some("wall")], &[Some("wall"), None]]),
                layer("base", 0, &[&[Some("floor"), Some("wall")], &[Some("floor"), Some("floor")]]),
            ],
            ..Default::default()
        })
        .expect("assemble");
        assert_eq!(model.collidable_tiles, vec![Position::new(1, 0), Position::new(0, 1)]);
        let ids: Vec<_> = model.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["base", "top"]);
    }

    #[test]
    fn test_ground_layer_synthesized() {
        let model = assemble(MapParts {
            id: "empty".into(),
            size: Some(Size::new(3, 2)),
            ..Default::default()
        })
        .expect("assemble");
        assert_eq!(model.layers.len(), 1);
        let ground = &model.layers[0];
        assert_eq!(ground.id, "ground");
        assert_eq!((ground.width(), ground.height()), (3, 2));
        assert_eq!(ground.tiles[1][2].as_deref(), Some("floor"));
        assert!(model.tile_types.contains_key("floor"));
        assert!(model.collidable_tiles.is_empty());
    }

    #[test]
    fn test_minimum_size_is_unit() {
        let model = assemble(MapParts {
            id: "tiny".into(),
            ..Default::default()
        })
        .expect("assemble");
        assert_eq!(model.size, Size::UNIT);
        assert_eq!(model.spawn, Position::new(0, 0));
        assert_eq!(model.blocked_areas.len(), 4);
    }
}
