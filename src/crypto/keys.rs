//! Sealed Gallery - Key Material
//!
//! The private key is a JSON file holding two hex-encoded 256-bit secrets:
//! the master key (per-file keys are derived from it) and the HMAC key.

use std::fmt;
use std::path::Path;
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{GalleryError, GalleryResult};

/// Key length for AES-256 and HMAC-SHA256
pub const KEY_LEN: usize = 32;

/// On-disk shape of a key file
#[derive(Serialize, Deserialize)]
struct KeyFile {
    master: String,
    hmac: String,
}

/// Private key for sealed images, zeroized on drop
pub struct GalleryKey {
    master: Secret<[u8; KEY_LEN]>,
    hmac: Secret<[u8; KEY_LEN]>,
}

impl GalleryKey {
    /// Create a key from raw bytes
    pub fn new(master: [u8; KEY_LEN], hmac: [u8; KEY_LEN]) -> Self {
        Self {
            master: Secret::new(master),
            hmac: Secret::new(hmac),
        }
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let mut master = [0u8; KEY_LEN];
        let mut hmac = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut master);
        rand::thread_rng().fill_bytes(&mut hmac);
        Self::new(master, hmac)
    }

    /// Read a key file
    pub fn load<P: AsRef<Path>>(path: P) -> GalleryResult<Self> {
        let path = path.as_ref();
        let key_error = |reason: String| GalleryError::KeyLoad {
            path: path.to_path_buf(),
            reason,
        };

        let json = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| key_error(e.to_string()))?);
        let file: KeyFile = serde_json::from_str(&json).map_err(|e| key_error(e.to_string()))?;

        let master = decode_secret(&file.master).map_err(|e| key_error(format!("master: {}", e)))?;
        let hmac = decode_secret(&file.hmac).map_err(|e| key_error(format!("hmac: {}", e)))?;

        Ok(Self::new(*master, *hmac))
    }

    /// Write the key as a key file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GalleryResult<()> {
        let file = KeyFile {
            master: hex::encode(self.master()),
            hmac: hex::encode(self.hmac()),
        };
        let json = Zeroizing::new(serde_json::to_string_pretty(&file)?);
        std::fs::write(path, json.as_bytes())?;
        Ok(())
    }

    /// Expose the master key bytes (use with caution)
    pub fn master(&self) -> &[u8; KEY_LEN] {
        self.master.expose_secret()
    }

    /// Expose the HMAC key bytes (use with caution)
    pub fn hmac(&self) -> &[u8; KEY_LEN] {
        self.hmac.expose_secret()
    }
}

impl fmt::Debug for GalleryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GalleryKey([REDACTED])")
    }
}

fn decode_secret(encoded: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, String> {
    let bytes = Zeroizing::new(hex::decode(encoded.trim()).map_err(|e| e.to_string())?);
    if bytes.len() != KEY_LEN {
        return Err(format!("expected {} bytes, got {}", KEY_LEN, bytes.len()));
    }

    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gallery.key");

        let key = GalleryKey::generate();
        key.save(&path).unwrap();

        let loaded = GalleryKey::load(&path).unwrap();
        assert_eq!(loaded.master(), key.master());
        assert_eq!(loaded.hmac(), key.hmac());
        assert_ne!(key.master(), key.hmac());
    }

    #[test]
    fn test_malformed_key_is_key_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.key");

        std::fs::write(&path, r#"{ "master": "abcd", "hmac": "zz" }"#).unwrap();
        assert!(matches!(GalleryKey::load(&path), Err(GalleryError::KeyLoad { .. })));

        std::fs::write(&path, "-----BEGIN NONSENSE-----").unwrap();
        assert!(matches!(GalleryKey::load(&path), Err(GalleryError::KeyLoad { .. })));

        let missing = dir.path().join("missing.key");
        assert!(matches!(GalleryKey::load(&missing), Err(GalleryError::KeyLoad { .. })));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = GalleryKey::new([7u8; KEY_LEN], [9u8; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "GalleryKey([REDACTED])");
    }
}
