//! Read-only object template registry.
//!
//! Templates live one per file (`*.obj` or `*.json`) in the first readable
//! directory of a search path. The registry loads lazily, caches the result
//! as an immutable snapshot and only rebuilds it on `force_reload`.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::model::ObjectTemplate;

/// Checked in order; the first one that is set wins.
pub const DIRECTORY_ENV_VARS: [&str; 3] = [
    "APP_OBJECT_DIRECTORIES",
    "APP_OBJECT_DIRECTORY",
    "OBJECTS_DIRECTORY",
];
const DEFAULT_DIRECTORIES: [&str; 3] = ["/app/objects", "./app/objects", "./objects"];
const TEMPLATE_EXTENSIONS: [&str; 2] = ["obj", "json"];

/// One loaded generation of templates, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    directory: Option<PathBuf>,
    templates: BTreeMap<String, ObjectTemplate>,
}

impl TemplateSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_templates(templates: impl IntoIterator<Item = ObjectTemplate>) -> Self {
        Self {
            directory: None,
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ObjectTemplate> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectTemplate> {
        self.templates.values()
    }

    /// Directory the set was read from, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Loads every template file in `dir`. Files that fail to parse are
    /// logged and skipped; only an unreadable directory is an error.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_template_file(path))
            .collect();
        files.sort();

        let mut templates = BTreeMap::new();
        for file in files {
            match load_template_file(&file) {
                Ok(template) => {
                    if let Some(previous) = templates.insert(template.id.clone(), template) {
                        log::warn!(
                            "template `{}` from {} replaced by {}",
                            previous.id,
                            previous.source.as_deref().unwrap_or(Path::new("?")).display(),
                            file.display()
                        );
                    }
                }
                Err(e) => log::error!("skipping template {}: {e:#}", file.display()),
            }
        }

        log::info!("loaded {} object templates from {}", templates.len(), dir.display());
        Ok(Self {
            directory: Some(dir.to_path_buf()),
            templates,
        })
    }
}

fn is_template_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TEMPLATE_EXTENSIONS.contains(&e))
}

pub fn load_template_file(path: &Path) -> Result<ObjectTemplate> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    ObjectTemplate::from_value(&value, Some(path.to_path_buf()))
}

/// Splits a directory list on `,` and the platform path separator.
pub fn parse_directory_list(value: &str) -> Vec<PathBuf> {
    let separator = if cfg!(windows) { ';' } else { ':' };
    value
        .split(|c| c == ',' || c == separator)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Drops repeated directories, comparing case-insensitively.
fn dedupe(directories: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    directories
        .into_iter()
        .filter(|dir| seen.insert(dir.to_string_lossy().to_lowercase()))
        .collect()
}

/// Process-wide template registry with explicit lifecycle.
#[derive(Debug)]
pub struct ObjectRegistry {
    directories: Vec<PathBuf>,
    snapshot: RwLock<Option<Arc<TemplateSet>>>,
}

impl ObjectRegistry {
    /// Searches exactly `directories`, in order.
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self {
            directories: dedupe(directories),
            snapshot: RwLock::new(None),
        }
    }

    /// `explicit`, then the environment directories, then the defaults.
    pub fn search_path(explicit: &[PathBuf]) -> Vec<PathBuf> {
        let from_env = DIRECTORY_ENV_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .map(|v| parse_directory_list(&v))
            .unwrap_or_default();

        explicit
            .iter()
            .cloned()
            .chain(from_env)
            .chain(DEFAULT_DIRECTORIES.iter().map(PathBuf::from))
            .collect()
    }

    pub fn from_env() -> Self {
        Self::new(Self::search_path(&[]))
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// The cached snapshot, loading it on first use.
    pub fn load(&self) -> Arc<TemplateSet> {
        let cached = self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match cached {
            Some(set) => set,
            None => self.force_reload(),
        }
    }

    /// Rebuilds the snapshot. Holders of the previous one keep it.
    pub fn force_reload(&self) -> Arc<TemplateSet> {
        let set = Arc::new(self.scan());
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&set));
        set
    }

    fn scan(&self) -> TemplateSet {
        for dir in &self.directories {
            match TemplateSet::load_dir(dir) {
                Ok(set) => return set,
                Err(e) => log::debug!("template directory {} unreadable: {e}", dir.display()),
            }
        }
        log::warn!(
            "no readable object template directory among {:?}; continuing without templates",
            self.directories
        );
        TemplateSet::empty()
    }
}
