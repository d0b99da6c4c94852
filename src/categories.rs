//! Sealed Gallery - Category Index
//!
//! Persistent mapping from category name to tagged files. Paths are stored
//! relative to a fixed root with POSIX separators so the store survives a
//! move to another machine as long as the root moves with it.
//!
//! The store is read once when the session opens and written once when it
//! closes. Lists are append-only: tagging the same file twice records it
//! twice.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{GalleryError, GalleryResult};

/// Indentation of the persisted store
const STORE_INDENT: &[u8] = b"   ";

/// Category Index - named groups of root-relative paths
#[derive(Debug)]
pub struct CategoryIndex {
    /// JSON store location
    store: PathBuf,
    /// Fixed root (canonical)
    root: PathBuf,
    /// Category name -> tagged paths
    categories: BTreeMap<String, Vec<String>>,
}

impl CategoryIndex {
    /// Load the store, creating an empty one if it does not exist
    pub fn load<P: AsRef<Path>, R: AsRef<Path>>(store: P, root: R) -> GalleryResult<Self> {
        let store = store.as_ref().to_path_buf();
        let root = fs::canonicalize(root.as_ref())?;

        let categories = if store.exists() {
            let json = fs::read_to_string(&store)?;
            serde_json::from_str::<BTreeMap<String, Vec<String>>>(&json)
                .map_err(|e| GalleryError::CorruptStore(format!("{}: {}", store.display(), e)))?
        } else {
            log::info!("Creating empty category store at {}", store.display());
            if let Some(parent) = store.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&store, "{}")?;
            BTreeMap::new()
        };

        log::debug!("Loaded {} categories from {}", categories.len(), store.display());

        Ok(Self { store, root, categories })
    }

    /// Write the full index with stable formatting
    pub fn persist(&self) -> GalleryResult<()> {
        let mut output = Vec::new();
        let formatter = PrettyFormatter::with_indent(STORE_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut output, formatter);
        self.categories.serialize(&mut serializer)?;

        if let Some(parent) = self.store.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.store, output)?;

        log::info!("Saved {} categories to {}", self.categories.len(), self.store.display());
        Ok(())
    }

    pub fn store_path(&self) -> &Path {
        &self.store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TAGGING
    // ═══════════════════════════════════════════════════════════════════════

    /// Append `path` to `category`, creating the category if absent
    pub fn add(&mut self, category: &str, path: &str) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(path.to_string());
    }

    /// Remove one occurrence of `path` from `category`; returns whether anything was removed
    pub fn remove(&mut self, category: &str, path: &str) -> bool {
        let Some(paths) = self.categories.get_mut(category) else {
            return false;
        };

        match paths.iter().position(|p| p == path) {
            Some(pos) => {
                paths.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Every category whose list contains `path` (exact match)
    pub fn categories_for(&self, path: &str) -> Vec<String> {
        self.categories
            .iter()
            .filter(|(_, paths)| paths.iter().any(|p| p == path))
            .map(|(name, _)| name.clone())
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════

    /// Candidates (file names inside `target_dir`) tagged with `category`.
    ///
    /// A candidate matches when `target_dir/name` is one of the resolved
    /// tagged paths. Locally, only tagged paths under `target_dir` count;
    /// globally, that restriction is dropped. Tagged paths that no longer
    /// exist are skipped. Candidate order is preserved.
    pub fn filter(
        &self,
        category: &str,
        candidates: &[String],
        target_dir: &Path,
        scope_global: bool,
    ) -> Vec<String> {
        let Some(paths) = self.categories.get(category) else {
            return Vec::new();
        };

        let target_dir = normalize(target_dir);
        let mut tagged = HashSet::new();

        for rel in paths {
            let resolved = self.resolve(rel);
            if !resolved.exists() {
                log::debug!("Skipping dead path {} in {}", rel, category);
                continue;
            }
            if scope_global || resolved.starts_with(&target_dir) {
                tagged.insert(resolved);
            }
        }

        candidates
            .iter()
            .filter(|name| tagged.contains(&target_dir.join(name.as_str())))
            .cloned()
            .collect()
    }

    /// Category names
    pub fn names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// (name, entry count) for each category
    pub fn summaries(&self) -> Vec<(String, usize)> {
        self.categories
            .iter()
            .map(|(name, paths)| (name.clone(), paths.len()))
            .collect()
    }

    /// Tagged paths of one category
    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Drop tagged paths whose file no longer exists; returns how many were dropped
    pub fn compact(&mut self) -> usize {
        let root = self.root.clone();
        let mut dropped = 0;

        for (name, paths) in self.categories.iter_mut() {
            let before = paths.len();
            paths.retain(|rel| normalize(&root.join(rel)).exists());
            let removed = before - paths.len();
            if removed > 0 {
                log::info!("Dropped {} dead paths from {}", removed, name);
            }
            dropped += removed;
        }

        dropped
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PATHS
    // ═══════════════════════════════════════════════════════════════════════

    /// Absolute path for a stored relative path
    pub fn resolve(&self, rel: &str) -> PathBuf {
        normalize(&self.root.join(rel))
    }

    /// Express `path` relative to the root with POSIX separators
    pub fn relative_to_root(&self, path: &Path) -> GalleryResult<String> {
        let absolute = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&std::env::current_dir()?.join(path))
        };

        relative_posix(&self.root, &absolute).ok_or_else(|| GalleryError::PathOutsideRoot {
            path: absolute.clone(),
            root: self.root.clone(),
        })
    }
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Relative path from `base` to `path` (both normalized, absolute); None without a common prefix
fn relative_posix(base: &Path, path: &Path) -> Option<String> {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = path.components().collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat("..".to_string()).take(base.len() - common));
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}
