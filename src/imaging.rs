//! Sealed Gallery - Image Decoding
//!
//! Decodes decrypted plaintext and fits it to a display box.

use std::path::Path;
use image::{DynamicImage, GenericImageView, imageops::FilterType};

use crate::error::{GalleryError, GalleryResult};

/// A decoded image held by the cache
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
}

impl DecodedImage {
    /// Decode image bytes (format guessed from content)
    pub fn decode(bytes: &[u8]) -> GalleryResult<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw pixel data in the decoded color type
    pub fn pixels(&self) -> &[u8] {
        self.image.as_bytes()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Resize to the largest size fitting inside `box_width` x `box_height`,
    /// keeping the aspect ratio (may upscale)
    pub fn fit_within(&self, box_width: u32, box_height: u32) -> GalleryResult<DecodedImage> {
        if box_width == 0 || box_height == 0 {
            return Err(GalleryError::ImageDecode(format!(
                "Cannot fit into empty box {}x{}",
                box_width, box_height
            )));
        }

        let resized = self.image.resize(box_width, box_height, FilterType::Lanczos3);
        Ok(Self { image: resized })
    }

    /// Save as plaintext; format is taken from the extension of `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GalleryResult<()> {
        self.image.save(path.as_ref())?;
        Ok(())
    }
}
