//! Sealed Gallery - Directory Scanner
//!
//! Lists the sealed images directly inside a target directory. Only the
//! file name suffix is checked; contents are not inspected.

use std::path::Path;
use walkdir::WalkDir;

use crate::error::{GalleryError, GalleryResult};

/// Suffixes eligible for browsing (exact, case-sensitive)
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Check whether a file name carries a supported suffix
pub fn is_supported(name: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// List eligible file names in `directory`, sorted by name.
///
/// Filesystem enumeration order is platform dependent, so the result is
/// sorted to keep positions stable across loads. Subdirectories are not
/// descended into.
pub fn scan<P: AsRef<Path>>(directory: P) -> GalleryResult<Vec<String>> {
    let directory = directory.as_ref();

    let mut files = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => GalleryError::Io(io),
            None => GalleryError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "filesystem loop while scanning",
            )),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            if is_supported(name) {
                files.push(name.to_string());
            }
        }
    }

    if files.is_empty() {
        return Err(GalleryError::EmptyDirectory(directory.to_path_buf()));
    }

    files.sort();
    log::info!("Found {} images in {}", files.len(), directory.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_filters_by_suffix() {
        let dir = tempdir().unwrap();
        for name in ["c.jpeg", "a.png", "b.jpg", "notes.txt", "upper.PNG", "archive.png.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = scan(dir.path()).unwrap();

        assert_eq!(files, vec!["a.png", "b.jpg", "c.jpeg"]);
        assert!(files.iter().all(|f| is_supported(f)));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();

        let result = scan(dir.path());
        assert!(matches!(result, Err(GalleryError::EmptyDirectory(_))));
    }

    #[test]
    fn test_scan_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let result = scan(dir.path().join("does-not-exist"));
        assert!(matches!(result, Err(GalleryError::Io(_))));
    }
}
