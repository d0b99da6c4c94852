//! # Sealed Gallery
//!
//! Browse a directory of individually-encrypted images: decrypt on demand,
//! keep a bounded plaintext working set, and tag files into categories that
//! persist across sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   NAVIGATION SESSION                     │
//! │   full list ──► working list (filter / sample) ──► pos  │
//! │         │                  │                    │       │
//! │  ┌──────┴──────┐  ┌────────┴────────┐  ┌────────┴─────┐ │
//! │  │  SCANNER    │  │ DECRYPTION CACHE│  │ CATEGORY     │ │
//! │  │  .png/.jpg  │  │ bounded, flush  │  │ INDEX (JSON) │ │
//! │  └─────────────┘  └────────┬────────┘  └──────────────┘ │
//! │                            │                            │
//! │                   ┌────────┴────────┐                   │
//! │                   │ CRYPTO PROVIDER │                   │
//! │                   │ sealed AES-GCM  │                   │
//! │                   └─────────────────┘                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! - Key and category store are loaded once when the session opens
//! - Plaintext lives in the transient cache directory only while the session runs
//! - Teardown wipes the cache directory and writes the category store

pub mod cache;
pub mod categories;
pub mod config;
pub mod crypto;
pub mod error;
pub mod imaging;
pub mod scanner;
pub mod secure_fs;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::DecryptionCache;
pub use categories::CategoryIndex;
pub use config::{EvictionPolicy, GalleryConfig};
pub use crypto::{CryptoProvider, GalleryKey, SealedImageCrypto};
pub use error::{GalleryError, GalleryResult};
pub use imaging::DecodedImage;
pub use session::{NavigationSession, SessionStatus};

/// Sealed Gallery version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
