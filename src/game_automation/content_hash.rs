//! Content-change detection for the scrolling log

use image::RgbImage;
use image::imageops::{self, FilterType};

/// Digest of a downsampled capture
///
/// Each side is divided by `precision` before hashing so one-pixel rendering jitter does
/// not register as new content. Captures too small to shrink are hashed as they are.
pub fn content_hash(image: &RgbImage, precision: u32) -> u32 {
    let precision = precision.max(1);
    let width = image.width() / precision;
    let height = image.height() / precision;

    if width == 0 || height == 0 || precision == 1 {
        return hash_pixels(image);
    }
    hash_pixels(&imageops::resize(image, width, height, FilterType::Triangle))
}

fn hash_pixels(image: &RgbImage) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&image.width().to_le_bytes());
    hasher.update(&image.height().to_le_bytes());
    hasher.update(image.as_raw());
    hasher.finalize()
}

/// Remembers the previous frame's digest
#[derive(Debug, Clone, Default)]
pub struct ContentTracker {
    precision: u32,
    last: Option<u32>,
}

impl ContentTracker {
    pub fn new(precision: u32) -> Self {
        Self {
            precision,
            last: None,
        }
    }

    /// Record a frame; true when it shows the same content as the previous one
    pub fn observe(&mut self, image: &RgbImage) -> bool {
        let hash = content_hash(image, self.precision);
        let unchanged = self.last == Some(hash);
        self.last = Some(hash);
        unchanged
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
