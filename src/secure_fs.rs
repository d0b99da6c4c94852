//! Sealed Gallery - Transient Plaintext Storage
//!
//! Decrypted files live here only while a session runs. Deletion overwrites
//! the plaintext before unlinking it.

use std::path::{Path, PathBuf};
use std::fs::{self, OpenOptions};
use std::io::Write;

use crate::error::GalleryResult;

/// Overwrite chunk for secure deletion
const WIPE_CHUNK: usize = 1024 * 1024;

/// Secure Filesystem Handler for the transient cache directory
#[derive(Debug, Clone)]
pub struct SecureFs {
    /// Root directory
    root: PathBuf,
}

impl SecureFs {
    /// Create new SecureFs with root directory (nothing is created yet)
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if absent
    pub fn ensure_root(&self) -> GalleryResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Full path for a file name inside the root
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Check if file exists
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    /// Wipe and delete one file; absent files are not an error
    pub fn delete_file(&self, name: &str) -> std::io::Result<()> {
        wipe_and_remove(&self.path_of(name))
    }

    /// List file names in the root
    pub fn list(&self) -> GalleryResult<Vec<String>> {
        let mut files = Vec::new();

        if self.root.exists() {
            for entry in fs::read_dir(&self.root)? {
                let entry = entry?;
                if let Some(name) = entry.file_name().to_str() {
                    files.push(name.to_string());
                }
            }
        }

        Ok(files)
    }

    /// Delete every file, then the root directory itself
    pub fn purge(&self) -> GalleryResult<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                log::info!("Deleting {}", path.display());
                wipe_and_remove(&path)?;
            }
            count += 1;
        }

        fs::remove_dir(&self.root)?;
        Ok(count)
    }
}

/// Overwrite a file with zeros, then unlink it
fn wipe_and_remove(path: &Path) -> std::io::Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let size = metadata.len() as usize;
    if size > 0 {
        if let Ok(mut file) = OpenOptions::new().write(true).open(path) {
            let zeros = vec![0u8; size.min(WIPE_CHUNK)];
            let mut remaining = size;
            while remaining > 0 {
                let to_write = remaining.min(zeros.len());
                if file.write_all(&zeros[..to_write]).is_err() {
                    break;
                }
                remaining -= to_write;
            }
            let _ = file.sync_all();
        }
    }

    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_delete_and_purge() {
        let dir = tempdir().unwrap();
        let cache = SecureFs::new(&dir.path().join("cache"));

        // Purging a directory that was never created is fine
        assert_eq!(cache.purge().unwrap(), 0);

        cache.ensure_root().unwrap();
        fs::write(cache.path_of("a.png"), b"plaintext a").unwrap();
        fs::write(cache.path_of("b.jpg"), b"plaintext b").unwrap();

        cache.delete_file("a.png").unwrap();
        assert!(!cache.exists("a.png"));
        // Deleting again is a no-op
        cache.delete_file("a.png").unwrap();

        assert_eq!(cache.list().unwrap(), vec!["b.jpg".to_string()]);

        assert_eq!(cache.purge().unwrap(), 1);
        assert!(!cache.root().exists());
    }
}
