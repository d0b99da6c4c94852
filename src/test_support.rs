//! Shared fixtures for unit tests

use std::cell::RefCell;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::DynamicImage;

use crate::crypto::CryptoProvider;
use crate::error::{GalleryError, GalleryResult};

/// PNG bytes of a blank image
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png).unwrap();
    buffer
}

/// Write `names` into `dir` as "encrypted" images (plain PNGs for the fake provider)
pub fn write_images(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for (i, name) in names.iter().enumerate() {
        fs::write(dir.join(name), png_bytes(10 + i as u32, 5)).unwrap();
    }
}

/// Provider that "decrypts" by copying and records every call.
/// Sources whose name contains "corrupt" fail; key files containing "bad" fail to load.
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl CountingProvider {
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some(name))
            .count()
    }
}

impl CryptoProvider for CountingProvider {
    type Key = String;

    fn load_private_key(&self, path: &Path) -> GalleryResult<String> {
        let text = fs::read_to_string(path).map_err(|e| GalleryError::KeyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if text.contains("bad") {
            return Err(GalleryError::KeyLoad {
                path: path.to_path_buf(),
                reason: "malformed".into(),
            });
        }
        Ok(text)
    }

    fn decrypt(&self, _key: &String, source: &Path, dest: &Path) -> GalleryResult<()> {
        self.calls.borrow_mut().push(source.to_path_buf());

        let corrupt = source
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.contains("corrupt"));
        if corrupt {
            return Err(GalleryError::Decrypt {
                path: source.to_path_buf(),
                reason: "corrupt ciphertext".into(),
            });
        }

        fs::copy(source, dest)?;
        Ok(())
    }
}
