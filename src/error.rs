//! Sealed Gallery - Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for gallery operations
pub type GalleryResult<T> = Result<T, GalleryError>;

/// Gallery error types
#[derive(Error, Debug)]
pub enum GalleryError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Failed to load private key {path}: {reason}")]
    KeyLoad { path: PathBuf, reason: String },

    #[error("Decryption failed for {path}: {reason}")]
    Decrypt { path: PathBuf, reason: String },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // ═══════════════════════════════════════════════════════════════
    // DIRECTORY / FILE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("No images found in {0}")]
    EmptyDirectory(PathBuf),

    #[error("Failed to remove {path}: {source}")]
    FileRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No directory loaded")]
    NoDirectory,

    #[error("Working list is empty")]
    NoCurrentFile,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // NAVIGATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Sample size {requested} outside 1..={population}")]
    InvalidSampleSize { requested: usize, population: usize },

    #[error("Position {requested} outside 1..={len}")]
    IndexOutOfRange { requested: usize, len: usize },

    // ═══════════════════════════════════════════════════════════════
    // CATEGORY STORE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Category store corrupted: {0}")]
    CorruptStore(String),

    #[error("{path} cannot be expressed relative to {root}")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ═══════════════════════════════════════════════════════════════
    // IMAGE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Image decode error: {0}")]
    ImageDecode(String),
}

impl GalleryError {
    /// Check if the session can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GalleryError::Io(_) | GalleryError::Serialization(_))
    }

    /// Check if the failed operation is guaranteed to have left session state untouched
    pub fn preserves_state(&self) -> bool {
        matches!(
            self,
            GalleryError::KeyLoad { .. }
                | GalleryError::EmptyDirectory(_)
                | GalleryError::Decrypt { .. }
                | GalleryError::FileRemoval { .. }
                | GalleryError::InvalidSampleSize { .. }
                | GalleryError::IndexOutOfRange { .. }
        )
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(e: serde_json::Error) -> Self {
        GalleryError::Serialization(e.to_string())
    }
}

impl From<image::ImageError> for GalleryError {
    fn from(e: image::ImageError) -> Self {
        GalleryError::ImageDecode(e.to_string())
    }
}
