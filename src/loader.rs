//! File system adapters around the pure compilers.

use std::fs;
use std::path::Path;

use crate::error::{MapError, Result};
use crate::model::MapModel;
use crate::parser;
use crate::processor::{CompileOptions, compile_mdl};

const MAP_EXTENSION: &str = "map";
const ENTRY_MAP: &str = "init.map";

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Compiles one file: `.json` goes to the Tiled importer, anything else is
/// read as MDL.
pub fn load_map_file(path: &Path, opts: &CompileOptions) -> Result<MapModel> {
    let mut opts = opts.clone();
    if opts.source_path.is_none() {
        opts.source_path = Some(path.display().to_string());
    }
    if is_json(path) {
        return parser::load_tiled_map(path, &opts);
    }
    let src = fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
    compile_mdl(&src, &opts)
}

/// Compiles every `*.map` file in `dir`, `init.map` first and the rest by
/// file name. A missing directory is not an error.
pub fn load_map_directory(dir: &Path, opts: &CompileOptions) -> Result<Vec<MapModel>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("map directory {} unreadable ({e}); no maps loaded", dir.display());
            return Ok(Vec::new());
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MapError::io(dir, e))?.path();
        let is_map = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(MAP_EXTENSION));
        if path.is_file() && is_map {
            files.push(path);
        }
    }
    files.sort_by_key(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (name != ENTRY_MAP, name)
    });

    let mut maps = Vec::with_capacity(files.len());
    for path in &files {
        let file_opts = CompileOptions {
            source_path: Some(path.display().to_string()),
            ..opts.clone()
        };
        let map = load_map_file(path, &file_opts).inspect_err(|e| {
            log::error!("failed to compile {}: {e}", path.display());
        })?;
        maps.push(map);
    }
    log::info!("loaded {} maps from {}", maps.len(), dir.display());
    Ok(maps)
}
