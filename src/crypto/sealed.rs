//! Sealed image file format
//!
//! Format of a sealed file:
//! ```text
//! [MAGIC 8B]["SEALIMG1"]
//! [VERSION 1B][0x01]
//! [SALT 16B][random, per file]
//! [NONCE 12B][random]
//! [CIPHERTEXT variable][AES-256-GCM encrypted]
//! [TAG 16B][GCM auth tag]
//! [HMAC 32B][HMAC-SHA256 of all above]
//! ```
//!
//! The file name is not bound into the ciphertext, so sealed images can be
//! renamed or moved freely.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fs;
use std::path::Path;
use zeroize::Zeroizing;

use super::keys::{GalleryKey, KEY_LEN};
use super::CryptoProvider;
use crate::error::{GalleryError, GalleryResult};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes identifying a sealed image
const MAGIC: &[u8; 8] = b"SEALIMG1";

/// Current format version
const VERSION: u8 = 0x01;

/// Per-file HKDF salt
const SALT_SIZE: usize = 16;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// GCM authentication tag size
const TAG_SIZE: usize = 16;

/// HMAC-SHA256 size
const HMAC_SIZE: usize = 32;

/// Header size: MAGIC(8) + VERSION(1) + SALT(16) + NONCE(12)
const HEADER_SIZE: usize = 8 + 1 + SALT_SIZE + NONCE_SIZE;

/// Minimum valid file size
const MIN_FILE_SIZE: usize = HEADER_SIZE + TAG_SIZE + HMAC_SIZE;

/// HKDF info for per-file keys
const FILE_KEY_INFO: &[u8] = b"SEALED:GALLERY:FILE:v1";

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// SealedImageCrypto
// ---------------------------------------------------------------------------

/// Crypto provider for the sealed image format
#[derive(Debug, Default, Clone, Copy)]
pub struct SealedImageCrypto;

impl SealedImageCrypto {
    pub fn new() -> Self {
        Self
    }

    /// Derive the per-file key from the master key and the file's salt
    fn derive_file_key(key: &GalleryKey, salt: &[u8]) -> GalleryResult<Zeroizing<[u8; KEY_LEN]>> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), key.master());

        let mut file_key = Zeroizing::new([0u8; KEY_LEN]);
        hkdf.expand(FILE_KEY_INFO, &mut *file_key)
            .map_err(|e| GalleryError::Encryption(e.to_string()))?;

        Ok(file_key)
    }

    fn mac(key: &GalleryKey) -> GalleryResult<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(key.hmac())
            .map_err(|e| GalleryError::Encryption(e.to_string()))
    }

    /// Seal plaintext bytes
    pub fn seal_bytes(&self, key: &GalleryKey, plaintext: &[u8]) -> GalleryResult<Vec<u8>> {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let file_key = Self::derive_file_key(key, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&*file_key)
            .map_err(|_| GalleryError::Encryption("Invalid key".into()))?;

        // Header is authenticated as AAD
        let mut output = Vec::with_capacity(HEADER_SIZE + plaintext.len() + TAG_SIZE + HMAC_SIZE);
        output.extend_from_slice(MAGIC);
        output.push(VERSION);
        output.extend_from_slice(&salt);
        output.extend_from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload { msg: plaintext, aad: &output[..HEADER_SIZE] },
            )
            .map_err(|_| GalleryError::Encryption("AES-GCM encryption failed".into()))?;
        output.extend_from_slice(&ciphertext);

        let mut mac = Self::mac(key)?;
        mac.update(&output);
        output.extend_from_slice(&mac.finalize().into_bytes());

        Ok(output)
    }

    /// Open sealed bytes
    pub fn open_bytes(&self, key: &GalleryKey, data: &[u8]) -> Result<Zeroizing<Vec<u8>>, String> {
        if data.len() < MIN_FILE_SIZE {
            return Err("File too small".into());
        }

        if &data[0..8] != MAGIC {
            return Err("Invalid magic bytes".into());
        }

        let version = data[8];
        if version != VERSION {
            return Err(format!("Unsupported version: {}", version));
        }

        let hmac_start = data.len() - HMAC_SIZE;
        let mut mac = Self::mac(key).map_err(|e| e.to_string())?;
        mac.update(&data[..hmac_start]);
        mac.verify_slice(&data[hmac_start..])
            .map_err(|_| "HMAC verification failed - wrong key or tampered file".to_string())?;

        let salt = &data[9..9 + SALT_SIZE];
        let nonce = Nonce::from_slice(&data[9 + SALT_SIZE..HEADER_SIZE]);
        let ciphertext = &data[HEADER_SIZE..hmac_start];

        let file_key = Self::derive_file_key(key, salt).map_err(|e| e.to_string())?;
        let cipher = Aes256Gcm::new_from_slice(&*file_key).map_err(|_| "Invalid key".to_string())?;

        let plaintext = cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad: &data[..HEADER_SIZE] })
            .map_err(|_| "Decryption failed - wrong key or corrupted".to_string())?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Seal a plaintext image file into `dest`
    pub fn encrypt(&self, key: &GalleryKey, source: &Path, dest: &Path) -> GalleryResult<usize> {
        let plaintext = Zeroizing::new(fs::read(source)?);
        let sealed = self.seal_bytes(key, &plaintext)?;
        fs::write(dest, &sealed)?;
        Ok(sealed.len())
    }
}

impl CryptoProvider for SealedImageCrypto {
    type Key = GalleryKey;

    fn load_private_key(&self, path: &Path) -> GalleryResult<GalleryKey> {
        GalleryKey::load(path)
    }

    fn decrypt(&self, key: &GalleryKey, source: &Path, dest: &Path) -> GalleryResult<()> {
        let decrypt_error = |reason: String| GalleryError::Decrypt {
            path: source.to_path_buf(),
            reason,
        };

        let data = fs::read(source).map_err(|e| decrypt_error(e.to_string()))?;
        let plaintext = self.open_bytes(key, &data).map_err(decrypt_error)?;

        fs::write(dest, &*plaintext)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_key() -> GalleryKey {
        GalleryKey::new([0x42u8; KEY_LEN], [0x43u8; KEY_LEN])
    }

    #[test]
    fn test_seal_open_bytes() {
        let crypto = SealedImageCrypto::new();
        let key = test_key();
        let plaintext = b"FAKE PNG DATA 1234567890";

        let sealed = crypto.seal_bytes(&key, plaintext).unwrap();
        let opened = crypto.open_bytes(&key, &sealed).unwrap();

        assert_eq!(opened.as_slice(), plaintext);
    }

    #[test]
    fn test_decrypt_file_to_dest() {
        let crypto = SealedImageCrypto::new();
        let key = test_key();
        let dir = tempdir().unwrap();

        let plain = dir.path().join("plain.png");
        let sealed = dir.path().join("photo.png");
        let out = dir.path().join("out.png");
        fs::write(&plain, b"not really a png").unwrap();

        crypto.encrypt(&key, &plain, &sealed).unwrap();
        assert_ne!(fs::read(&sealed).unwrap(), b"not really a png");

        crypto.decrypt(&key, &sealed, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"not really a png");
    }

    #[test]
    fn test_wrong_key_fails() {
        let crypto = SealedImageCrypto::new();
        let sealed = crypto.seal_bytes(&test_key(), b"secret").unwrap();

        assert!(crypto.open_bytes(&GalleryKey::generate(), &sealed).is_err());
    }

    #[test]
    fn test_tampered_data_fails() {
        let crypto = SealedImageCrypto::new();
        let key = test_key();

        let mut sealed = crypto.seal_bytes(&key, b"secret photo").unwrap();
        sealed[HEADER_SIZE + 3] ^= 0xFF;

        assert!(crypto.open_bytes(&key, &sealed).is_err());
    }

    #[test]
    fn test_corrupt_file_is_decrypt_error() {
        let crypto = SealedImageCrypto::new();
        let dir = tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        let dest = dir.path().join("out.jpg");
        fs::write(&source, b"SEALIMG1 but way too short").unwrap();

        let result = crypto.decrypt(&test_key(), &source, &dest);
        assert!(matches!(result, Err(GalleryError::Decrypt { .. })));
        assert!(!dest.exists());
    }
}
