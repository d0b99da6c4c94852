//! Sealed Gallery - Navigation Session
//!
//! Owns the key, the decryption cache and the category index, plus the
//! navigable state: the full scan of the target directory, the working list
//! derived from it (filtered or sampled) and the current position.
//!
//! Every operation runs to completion before returning. Rejected requests
//! leave the state exactly as it was.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use rand::Rng;

use crate::cache::DecryptionCache;
use crate::categories::CategoryIndex;
use crate::config::GalleryConfig;
use crate::crypto::CryptoProvider;
use crate::error::{GalleryError, GalleryResult};
use crate::imaging::DecodedImage;
use crate::scanner;

/// Navigation Session
pub struct NavigationSession<P: CryptoProvider> {
    /// Private key, never persisted
    key: P::Key,
    /// Where the key came from (status display)
    key_path: PathBuf,
    /// Decrypted working set
    cache: DecryptionCache<P>,
    /// Persistent categories
    categories: CategoryIndex,
    /// Directory of the current full list (canonical)
    target_dir: Option<PathBuf>,
    /// Last directory asked for, even if it had no images
    requested_dir: Option<PathBuf>,
    /// Snapshot of the last successful scan
    full_list: Vec<String>,
    /// Navigable view of `full_list`
    working_list: Vec<String>,
    /// Current position in `working_list`
    index: usize,
}

impl<P: CryptoProvider> NavigationSession<P> {
    // ═══════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the key and the category store, and set up an empty cache
    pub fn open<K: AsRef<Path>>(provider: P, key_path: K, config: &GalleryConfig) -> GalleryResult<Self> {
        let key_path = key_path.as_ref().to_path_buf();
        let key = provider.load_private_key(&key_path)?;
        let categories = CategoryIndex::load(&config.category_store, &config.root)?;
        let cache = DecryptionCache::new(provider, &config.cache_dir, config.cache_capacity, config.eviction);

        log::info!("Session opened with key {}", key_path.display());

        Ok(Self {
            key,
            key_path,
            cache,
            categories,
            target_dir: None,
            requested_dir: None,
            full_list: Vec::new(),
            working_list: Vec::new(),
            index: 0,
        })
    }

    /// Replace the key; on failure the current key stays in place
    pub fn reload_key<K: AsRef<Path>>(&mut self, key_path: K) -> GalleryResult<()> {
        let key_path = key_path.as_ref();
        let key = self.cache.provider().load_private_key(key_path)?;

        // Residents were decrypted with the old key
        self.cache.clear()?;
        self.key = key;
        self.key_path = key_path.to_path_buf();
        Ok(())
    }

    /// Delete all transient plaintext and persist the category store
    pub fn teardown(mut self) -> GalleryResult<()> {
        let destroyed = self.cache.destroy();
        let persisted = self.categories.persist();
        destroyed?;
        persisted?;
        log::info!("Session closed");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DIRECTORY
    // ═══════════════════════════════════════════════════════════════════════

    /// Scan `dir` and make it the target; returns the number of images found.
    ///
    /// When the directory has no images the previous working set is kept,
    /// but the directory is remembered for [`rescan`](Self::rescan).
    pub fn load_directory<D: AsRef<Path>>(&mut self, dir: D) -> GalleryResult<usize> {
        let dir = fs::canonicalize(dir.as_ref())?;
        self.requested_dir = Some(dir.clone());

        let files = scanner::scan(&dir)?;
        self.cache.prepare()?;

        if self.target_dir.as_deref() != Some(dir.as_path()) {
            // Entries are keyed by file name only
            self.cache.clear()?;
        }

        log::info!("Loaded {} ({} images)", dir.display(), files.len());

        self.target_dir = Some(dir);
        self.working_list = files.clone();
        self.full_list = files;
        self.index = 0;

        Ok(self.full_list.len())
    }

    /// Scan the last requested directory again
    pub fn rescan(&mut self) -> GalleryResult<usize> {
        let dir = self.requested_dir.clone().ok_or(GalleryError::NoDirectory)?;
        self.load_directory(dir)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NAVIGATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Move toward the start; no-op at the first element
    pub fn step_backward(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Move toward the end; no-op at the last element
    pub fn step_forward(&mut self) -> bool {
        if self.index + 1 < self.working_list.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Jump to a 1-based position
    pub fn goto_index(&mut self, position: usize) -> GalleryResult<()> {
        let len = self.working_list.len();
        if position == 0 || position > len {
            return Err(GalleryError::IndexOutOfRange { requested: position, len });
        }

        self.index = position - 1;
        Ok(())
    }

    /// Replace the working list with `k` distinct random files from the full list
    pub fn sample_random(&mut self, k: usize) -> GalleryResult<()> {
        self.sample_random_with(k, &mut rand::thread_rng())
    }

    /// [`sample_random`](Self::sample_random) with an explicit RNG
    pub fn sample_random_with<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> GalleryResult<()> {
        let population = self.full_list.len();
        if k == 0 || k > population {
            return Err(GalleryError::InvalidSampleSize { requested: k, population });
        }

        let picked = rand::seq::index::sample(rng, population, k);
        self.working_list = picked.iter().map(|i| self.full_list[i].clone()).collect();
        self.index = 0;

        log::info!("Sampled {} of {} files", k, population);
        Ok(())
    }

    /// Replace the working list with the files tagged `category`; returns its length
    pub fn filter_by_category(&mut self, category: &str, scope_global: bool) -> GalleryResult<usize> {
        let target_dir = self.target_dir.as_ref().ok_or(GalleryError::NoDirectory)?;

        self.working_list = self.categories.filter(category, &self.full_list, target_dir, scope_global);
        self.index = 0;

        log::info!("Loaded category {} ({} files)", category, self.working_list.len());
        Ok(self.working_list.len())
    }

    /// Restore the working list to the full scan
    pub fn show_all(&mut self) {
        self.working_list = self.full_list.clone();
        self.index = 0;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CURRENT FILE
    // ═══════════════════════════════════════════════════════════════════════

    /// Decoded image of the current file, decrypting it if not resident
    pub fn current_image(&mut self) -> GalleryResult<Arc<DecodedImage>> {
        let target_dir = self.target_dir.as_ref().ok_or(GalleryError::NoDirectory)?;
        let file = self.working_list.get(self.index).ok_or(GalleryError::NoCurrentFile)?;
        self.cache.get(&self.key, target_dir, file)
    }

    /// Save the current image, decrypted, to `dest`
    pub fn export_current<D: AsRef<Path>>(&mut self, dest: D) -> GalleryResult<()> {
        let image = self.current_image()?;
        image.save(dest.as_ref())?;
        log::info!("Exported {}", dest.as_ref().display());
        Ok(())
    }

    /// Delete the current file from disk and from the working list.
    ///
    /// The following file becomes current. If deletion fails nothing is
    /// removed from the lists.
    pub fn remove_current(&mut self) -> GalleryResult<String> {
        let source = self.current_path()?;
        let name = self.working_list[self.index].clone();

        self.cache.evict(&name).map_err(|e| GalleryError::FileRemoval {
            path: self.cache.transient_path(&name),
            source: e,
        })?;

        log::info!("Deleting {}", source.display());
        fs::remove_file(&source).map_err(|e| GalleryError::FileRemoval {
            path: source.clone(),
            source: e,
        })?;

        self.working_list.remove(self.index);
        if let Some(pos) = self.full_list.iter().position(|f| f == &name) {
            self.full_list.remove(pos);
        }
        if self.index >= self.working_list.len() && !self.working_list.is_empty() {
            self.index = self.working_list.len() - 1;
        }

        Ok(name)
    }

    /// Tag the current file; returns the stored root-relative path
    pub fn tag(&mut self, category: &str) -> GalleryResult<String> {
        let rel = self.current_relative()?;
        self.categories.add(category, &rel);
        Ok(rel)
    }

    /// Remove one tag of the current file; returns whether it was tagged
    pub fn untag(&mut self, category: &str) -> GalleryResult<bool> {
        let rel = self.current_relative()?;
        Ok(self.categories.remove(category, &rel))
    }

    /// Categories of the current file
    pub fn current_categories(&self) -> GalleryResult<Vec<String>> {
        let rel = self.current_relative()?;
        Ok(self.categories.categories_for(&rel))
    }

    /// Absolute path of the current (sealed) file
    pub fn current_path(&self) -> GalleryResult<PathBuf> {
        let target_dir = self.target_dir.as_ref().ok_or(GalleryError::NoDirectory)?;
        let file = self.current_file().ok_or(GalleryError::NoCurrentFile)?;
        Ok(target_dir.join(file))
    }

    fn current_relative(&self) -> GalleryResult<String> {
        let path = self.current_path()?;
        self.categories.relative_to_root(&path)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn current_file(&self) -> Option<&str> {
        self.working_list.get(self.index).map(String::as_str)
    }

    /// Current 0-based position
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn working_list(&self) -> &[String] {
        &self.working_list
    }

    pub fn full_list(&self) -> &[String] {
        &self.full_list
    }

    pub fn target_dir(&self) -> Option<&Path> {
        self.target_dir.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.working_list.is_empty()
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn cache(&self) -> &DecryptionCache<P> {
        &self.cache
    }

    pub fn categories(&self) -> &CategoryIndex {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategoryIndex {
        &mut self.categories
    }

    /// Snapshot for a status line; dimensions only if the image is resident
    pub fn status(&self) -> SessionStatus {
        let current = self.current_file();

        SessionStatus {
            position: current.map(|_| self.index + 1),
            total: self.working_list.len(),
            key_path: self.key_path.clone(),
            target_dir: self.target_dir.clone(),
            categories: self.current_categories().unwrap_or_default(),
            dimensions: current
                .and_then(|f| self.cache.peek(f))
                .map(|image| image.dimensions()),
        }
    }
}

/// What a status bar shows about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// 1-based position, None when the working list is empty
    pub position: Option<usize>,
    pub total: usize,
    pub key_path: PathBuf,
    pub target_dir: Option<PathBuf>,
    pub categories: Vec<String>,
    pub dimensions: Option<(u32, u32)>,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(position), Some(dir)) = (self.position, self.target_dir.as_ref()) else {
            return f.write_str("In no/empty directory");
        };

        let sep = "   ";
        write!(f, "{} / {}{}KEY: {}", position, self.total, sep, self.key_path.display())?;
        write!(f, "{}DIR: {}{}CAT: {}", sep, dir.display(), sep, self.categories.join(", "))?;
        if let Some((w, h)) = self.dimensions {
            write!(f, "{}W/H: {}/{}", sep, w, h)?;
        }
        Ok(())
    }
}
