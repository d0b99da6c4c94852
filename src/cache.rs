//! Sealed Gallery - Decryption Cache
//!
//! Decrypts a sealed image the first time it is requested, keeps the
//! plaintext in the transient directory and the decoded image in memory.
//! A resident file is never decrypted again until it is evicted.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use lru::LruCache;

use crate::config::EvictionPolicy;
use crate::crypto::CryptoProvider;
use crate::error::{GalleryError, GalleryResult};
use crate::imaging::DecodedImage;
use crate::secure_fs::SecureFs;

/// Bounded cache of decoded images, keyed by file name
pub struct DecryptionCache<P: CryptoProvider> {
    /// Decrypts on miss
    provider: P,
    /// Transient plaintext directory
    storage: SecureFs,
    /// Resident images in recency order
    entries: LruCache<String, Arc<DecodedImage>>,
    /// Capacity policy
    policy: EvictionPolicy,
}

impl<P: CryptoProvider> DecryptionCache<P> {
    /// Create a cache over `cache_dir`; the directory is created on first use
    pub fn new(provider: P, cache_dir: &Path, capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            storage: SecureFs::new(cache_dir),
            entries: LruCache::new(capacity),
            policy,
        }
    }

    /// Create the transient directory if absent
    pub fn prepare(&self) -> GalleryResult<()> {
        self.storage.ensure_root()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains(filename)
    }

    /// Resident file names, least recently used first
    pub fn resident(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(|(name, _)| name.as_str())
    }

    /// Resident image without decrypting or touching recency
    pub fn peek(&self, filename: &str) -> Option<Arc<DecodedImage>> {
        self.entries.peek(filename).cloned()
    }

    /// Where the plaintext of `filename` lives while resident
    pub fn transient_path(&self, filename: &str) -> std::path::PathBuf {
        self.storage.path_of(filename)
    }

    /// Decoded image for `filename` inside `target_dir`, decrypting on miss
    pub fn get(
        &mut self,
        key: &P::Key,
        target_dir: &Path,
        filename: &str,
    ) -> GalleryResult<Arc<DecodedImage>> {
        if let Some(image) = self.entries.get(filename).cloned() {
            log::debug!("Cache hit: {}", filename);
            return Ok(image);
        }

        log::debug!("Cache miss: {}", filename);
        let image = Arc::new(self.decrypt_and_decode(key, target_dir, filename)?);

        // Only a successfully decoded image may displace residents
        if self.entries.len() >= self.capacity() {
            if let Err(e) = self.make_room() {
                self.discard_plaintext(filename);
                return Err(e);
            }
        }

        self.entries.put(filename.to_string(), Arc::clone(&image));
        Ok(image)
    }

    /// Drop one entry and delete its plaintext; returns whether it was resident
    pub fn evict(&mut self, filename: &str) -> std::io::Result<bool> {
        self.storage.delete_file(filename)?;
        Ok(self.entries.pop(filename).is_some())
    }

    /// Delete every transient plaintext file and empty the map
    pub fn clear(&mut self) -> GalleryResult<()> {
        let mut first_error = None;

        while let Some((name, _)) = self.entries.pop_lru() {
            log::info!("Deleting {}", self.storage.path_of(&name).display());
            if let Err(e) = self.storage.delete_file(&name) {
                log::warn!("Failed to delete cached {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Clear, then remove the transient directory and anything left in it
    pub fn destroy(&mut self) -> GalleryResult<()> {
        let cleared = self.clear();
        let purged = self.storage.purge();
        cleared?;
        purged?;
        Ok(())
    }

    fn decrypt_and_decode(
        &self,
        key: &P::Key,
        target_dir: &Path,
        filename: &str,
    ) -> GalleryResult<DecodedImage> {
        self.storage.ensure_root()?;

        let source = target_dir.join(filename);
        let dest = self.storage.path_of(filename);

        if let Err(e) = self.provider.decrypt(key, &source, &dest) {
            log::warn!("Failed to decrypt {}: {}", source.display(), e);
            self.discard_plaintext(filename);
            return Err(e);
        }

        let decoded = std::fs::read(&dest)
            .map_err(GalleryError::from)
            .and_then(|bytes| DecodedImage::decode(&bytes));

        if decoded.is_err() {
            self.discard_plaintext(filename);
        }
        decoded
    }

    /// Delete plaintext that never became an entry
    fn discard_plaintext(&self, filename: &str) {
        if let Err(e) = self.storage.delete_file(filename) {
            log::warn!("Failed to delete transient {}: {}", filename, e);
        }
    }

    fn make_room(&mut self) -> GalleryResult<()> {
        match self.policy {
            EvictionPolicy::FullFlush => {
                log::info!("Cache full ({} entries), flushing", self.entries.len());
                self.clear()
            }
            EvictionPolicy::LeastRecentlyUsed => {
                if let Some(oldest) = self.entries.peek_lru().map(|(name, _)| name.clone()) {
                    log::debug!("Evicting least recently used {}", oldest);
                    self.storage.delete_file(&oldest)?;
                    self.entries.pop(&oldest);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_images, CountingProvider};
    use tempfile::tempdir;

    fn key() -> String {
        "test-key".to_string()
    }

    fn cache_with(
        capacity: usize,
        policy: EvictionPolicy,
    ) -> (tempfile::TempDir, CountingProvider, DecryptionCache<CountingProvider>) {
        let dir = tempdir().unwrap();
        write_images(&dir.path().join("src"), &["f1.png", "f2.jpg", "f3.jpeg", "f4.png"]);
        let provider = CountingProvider::default();
        let cache = DecryptionCache::new(provider.clone(), &dir.path().join("cache"), capacity, policy);
        (dir, provider, cache)
    }

    #[test]
    fn test_hit_does_not_decrypt_again() {
        let (dir, provider, mut cache) = cache_with(4, EvictionPolicy::FullFlush);
        let src = dir.path().join("src");

        let first = cache.get(&key(), &src, "f1.png").unwrap();
        let second = cache.get(&key(), &src, "f1.png").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.dimensions(), (10, 5));
        assert_eq!(provider.calls_for("f1.png"), 1);
        assert!(dir.path().join("cache").join("f1.png").exists());
    }

    #[test]
    fn test_full_flush_on_overflow() {
        let (dir, provider, mut cache) = cache_with(2, EvictionPolicy::FullFlush);
        let src = dir.path().join("src");

        cache.get(&key(), &src, "f1.png").unwrap();
        cache.get(&key(), &src, "f2.jpg").unwrap();
        assert_eq!(cache.len(), 2);

        cache.get(&key(), &src, "f3.jpeg").unwrap();

        assert_eq!(provider.call_count(), 3);
        assert_eq!(cache.resident().collect::<Vec<_>>(), vec!["f3.jpeg"]);
        assert!(!dir.path().join("cache").join("f1.png").exists());
        assert!(!dir.path().join("cache").join("f2.jpg").exists());
        assert!(dir.path().join("cache").join("f3.jpeg").exists());

        // Flushed entries are decrypted again on the next access
        cache.get(&key(), &src, "f1.png").unwrap();
        assert_eq!(provider.calls_for("f1.png"), 2);
    }

    #[test]
    fn test_lru_evicts_only_oldest() {
        let (dir, provider, mut cache) = cache_with(2, EvictionPolicy::LeastRecentlyUsed);
        let src = dir.path().join("src");

        cache.get(&key(), &src, "f1.png").unwrap();
        cache.get(&key(), &src, "f2.jpg").unwrap();
        // f1 becomes most recent, so f2 is the one to go
        cache.get(&key(), &src, "f1.png").unwrap();
        cache.get(&key(), &src, "f3.jpeg").unwrap();

        assert!(cache.contains("f1.png"));
        assert!(!cache.contains("f2.jpg"));
        assert!(cache.contains("f3.jpeg"));
        assert!(cache.len() <= cache.capacity());
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        for policy in [EvictionPolicy::FullFlush, EvictionPolicy::LeastRecentlyUsed] {
            let (dir, _provider, mut cache) = cache_with(3, policy);
            let src = dir.path().join("src");

            for name in ["f1.png", "f2.jpg", "f3.jpeg", "f4.png", "f2.jpg", "f1.png", "f4.png"] {
                cache.get(&key(), &src, name).unwrap();
                assert!(cache.len() <= 3);
                assert!(cache.contains(name));
            }
        }
    }

    #[test]
    fn test_decrypt_failure_leaves_cache_untouched() {
        let (dir, _provider, mut cache) = cache_with(1, EvictionPolicy::FullFlush);
        let src = dir.path().join("src");
        write_images(&src, &["corrupt.png"]);

        cache.get(&key(), &src, "f1.png").unwrap();
        let result = cache.get(&key(), &src, "corrupt.png");

        assert!(matches!(result, Err(GalleryError::Decrypt { .. })));
        assert!(!cache.contains("corrupt.png"));
        // Cache was full, but the failed miss must not flush
        assert!(cache.contains("f1.png"));
        assert!(!dir.path().join("cache").join("corrupt.png").exists());
    }

    #[test]
    fn test_undecodable_plaintext_is_not_inserted() {
        let (dir, _provider, mut cache) = cache_with(4, EvictionPolicy::FullFlush);
        let src = dir.path().join("src");
        std::fs::write(src.join("text.png"), b"plain text pretending").unwrap();

        let result = cache.get(&key(), &src, "text.png");

        assert!(matches!(result, Err(GalleryError::ImageDecode(_))));
        assert!(cache.is_empty());
        assert!(!dir.path().join("cache").join("text.png").exists());
    }

    #[test]
    fn test_evict_and_destroy() {
        let (dir, _provider, mut cache) = cache_with(4, EvictionPolicy::FullFlush);
        let src = dir.path().join("src");

        cache.get(&key(), &src, "f1.png").unwrap();
        cache.get(&key(), &src, "f2.jpg").unwrap();

        assert!(cache.evict("f1.png").unwrap());
        assert!(!cache.evict("f1.png").unwrap());
        assert_eq!(cache.len(), 1);

        cache.destroy().unwrap();
        assert!(cache.is_empty());
        assert!(!dir.path().join("cache").exists());

        // Safe to call again once empty
        cache.clear().unwrap();
        cache.destroy().unwrap();
    }

    #[test]
    fn test_failed_eviction_keeps_resident_and_drops_new_plaintext() {
        let (dir, _provider, mut cache) = cache_with(1, EvictionPolicy::LeastRecentlyUsed);
        let src = dir.path().join("src");
        let transient = dir.path().join("cache");

        cache.get(&key(), &src, "f1.png").unwrap();

        // A non-empty directory in place of the plaintext cannot be unlinked
        std::fs::remove_file(transient.join("f1.png")).unwrap();
        std::fs::create_dir(transient.join("f1.png")).unwrap();
        std::fs::write(transient.join("f1.png").join("pin"), b"x").unwrap();

        let result = cache.get(&key(), &src, "f2.jpg");

        assert!(matches!(result, Err(GalleryError::Io(_))));
        assert!(cache.contains("f1.png"));
        assert!(!cache.contains("f2.jpg"));
        assert!(!transient.join("f2.jpg").exists());
    }
}
