//! Error type shared by every compiler stage.
//!
//! Any of these aborts the whole compile; no partial `MapModel` is ever
//! handed back to the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("tile symbol `{symbol}` is already bound to `{existing}`, cannot rebind it to `{requested}`")]
    ConflictingSymbol {
        symbol: String,
        existing: String,
        requested: String,
    },

    #[error("layer `{layer}` row {row} has {found} cells, expected {expected}")]
    UnequalLayerWidth {
        layer: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("map size {width}x{height} exceeds the {max} cell limit")]
    MapTooLarge { width: u32, height: u32, max: u64 },

    #[error("layer `{layer}` row {row}: unknown tile reference `{token}`")]
    UnknownTileReference {
        layer: String,
        row: usize,
        token: String,
    },

    #[error("[{section}] object #{entry} (line {line}): {reason} in `{content}`")]
    MalformedObjectLine {
        section: String,
        /// 1-based position of the entry inside its section.
        entry: usize,
        /// 1-based line in the source text.
        line: usize,
        content: String,
        reason: String,
    },

    #[error("invalid door entry `{entry}`: {reason}")]
    InvalidDoorCoordinate { entry: String, reason: String },

    #[error("malformed tile definition at line {line}: `{content}`")]
    MalformedTileDefinition { line: usize, content: String },

    #[error("invalid Tiled map: {0}")]
    InvalidTiledMap(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MapError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MapError> = std::result::Result<T, E>;
