//! Sealed Gallery - Configuration
//!
//! Where the transient cache and the category store live, and how large
//! the decrypted working set may grow.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::GalleryResult;

/// Default number of decoded images kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// What the cache does once it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Drop every entry, then admit the new one
    #[default]
    FullFlush,
    /// Drop only the least recently used entry
    LeastRecentlyUsed,
}

/// Gallery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Directory holding decrypted plaintext while the session runs
    pub cache_dir: PathBuf,
    /// JSON file mapping category names to tagged paths
    pub category_store: PathBuf,
    /// Fixed root every tagged path is stored relative to
    pub root: PathBuf,
    /// Max decoded images resident at once
    pub cache_capacity: usize,
    /// Capacity policy
    pub eviction: EvictionPolicy,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            category_store: PathBuf::from("./conf.json"),
            root: PathBuf::from("."),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            eviction: EvictionPolicy::FullFlush,
        }
    }
}

impl GalleryConfig {
    /// Load configuration from a JSON file, falling back to defaults when it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> GalleryResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config: GalleryConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Config with every location placed under `base` (used by tests and demos)
    pub fn rooted_at<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref();
        Self {
            cache_dir: base.join("cache"),
            category_store: base.join("conf.json"),
            root: base.to_path_buf(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = GalleryConfig::load(dir.path().join("gallery.json")).unwrap();

        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.eviction, EvictionPolicy::FullFlush);
        assert_eq!(config.category_store, PathBuf::from("./conf.json"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        std::fs::write(&path, r#"{ "cache_capacity": 2, "eviction": "least_recently_used" }"#).unwrap();

        let config = GalleryConfig::load(&path).unwrap();
        assert_eq!(config.cache_capacity, 2);
        assert_eq!(config.eviction, EvictionPolicy::LeastRecentlyUsed);
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(GalleryConfig::load(&path).is_err());
    }
}
