//! Sealed Gallery - Crypto Provider
//!
//! The cache only needs two things from cryptography: turning a key file into
//! a key, and turning a sealed file into a plaintext file. Both sit behind
//! [`CryptoProvider`] so the gallery never depends on a particular format.

pub mod keys;
pub mod sealed;

use std::path::Path;

use crate::error::GalleryResult;

pub use keys::{GalleryKey, KEY_LEN};
pub use sealed::SealedImageCrypto;

/// Source of keys and plaintext for the gallery
pub trait CryptoProvider {
    /// Opaque credential, owned by the session for its lifetime
    type Key;

    /// Load a private key; fails with `GalleryError::KeyLoad`
    fn load_private_key(&self, path: &Path) -> GalleryResult<Self::Key>;

    /// Decrypt `source` into the plaintext file `dest`; fails with `GalleryError::Decrypt`
    fn decrypt(&self, key: &Self::Key, source: &Path, dest: &Path) -> GalleryResult<()>;
}
