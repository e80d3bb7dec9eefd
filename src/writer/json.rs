//! Pretty JSON artifacts for the rendering and server collaborators.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::MapModel;
use crate::templates::BoundMap;

fn write_pretty<T: Serialize + ?Sized>(value: &T, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    out.flush()
}

/// Writes `<id>.json` and returns its path.
pub fn emit(map: &MapModel, out_dir: &Path) -> io::Result<PathBuf> {
    let path = out_dir.join(format!("{}.json", map.id));
    write_pretty(map, &path)?;
    log::info!("wrote {}", path.display());
    Ok(path)
}

/// Writes the client-safe view as `<id>.public.json`.
pub fn emit_bound(bound: &BoundMap, out_dir: &Path) -> io::Result<PathBuf> {
    let path = out_dir.join(format!("{}.public.json", bound.map.id));
    write_pretty(&bound.public_view()?, &path)?;
    log::info!("wrote {}", path.display());
    Ok(path)
}
