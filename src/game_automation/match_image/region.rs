//! Screen regions for targeted capture and matching

use image::{GrayImage, RgbImage, imageops};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangle in absolute screen coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub name: String,
}

impl SearchRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32, name: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            name: name.into(),
        }
    }

    /// Create a region from two corners (top-left inclusive, bottom-right exclusive)
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32, name: impl Into<String>) -> Self {
        Self::new(
            x1.min(x2),
            y1.min(y2),
            x1.abs_diff(x2),
            y1.abs_diff(y2),
            name,
        )
    }

    /// Create a full-screen region
    pub fn full_screen(screen_width: u32, screen_height: u32) -> Self {
        Self::new(0, 0, screen_width, screen_height, "full_screen")
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Check if this region contains a point
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        (x as i64) >= self.x as i64
            && (x as i64) < self.right()
            && (y as i64) >= self.y as i64
            && (y as i64) < self.bottom()
    }

    /// Get the center point of this region
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Check if this region is valid (non-zero dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Check if this region lies entirely inside `outer`
    pub fn is_within(&self, outer: &SearchRegion) -> bool {
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }

    /// Translate a point local to this region into absolute screen coordinates
    pub fn to_absolute(&self, local_x: u32, local_y: u32) -> (i32, i32) {
        (self.x + local_x as i32, self.y + local_y as i32)
    }

    /// Clip region to screen boundaries; `None` when nothing is left
    pub fn clip_to_screen(&self, screen_width: u32, screen_height: u32) -> Option<SearchRegion> {
        self.intersect(&SearchRegion::full_screen(screen_width, screen_height))
    }

    pub fn intersect(&self, other: &SearchRegion) -> Option<SearchRegion> {
        let x1 = self.x.max(other.x) as i64;
        let y1 = self.y.max(other.y) as i64;
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(SearchRegion::new(
            x1 as i32,
            y1 as i32,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.name.clone(),
        ))
    }

    /// Position and size of this region inside an image captured at `origin`
    ///
    /// The region is clipped to the image first; `None` when it lies outside.
    fn local_window(&self, origin: &SearchRegion) -> Option<(u32, u32, u32, u32)> {
        let clipped = self.intersect(origin)?;
        Some((
            (clipped.x - origin.x) as u32,
            (clipped.y - origin.y) as u32,
            clipped.width,
            clipped.height,
        ))
    }

    /// Cut this region out of an RGB capture taken at `origin`
    pub fn crop_rgb(&self, image: &RgbImage, origin: &SearchRegion) -> Option<RgbImage> {
        let (x, y, w, h) = self.local_window(origin)?;
        let w = w.min(image.width().saturating_sub(x));
        let h = h.min(image.height().saturating_sub(y));
        if w == 0 || h == 0 {
            return None;
        }
        Some(imageops::crop_imm(image, x, y, w, h).to_image())
    }

    /// Cut this region out of a grayscale capture taken at `origin`
    pub fn crop_gray(&self, image: &GrayImage, origin: &SearchRegion) -> Option<GrayImage> {
        let (x, y, w, h) = self.local_window(origin)?;
        let w = w.min(image.width().saturating_sub(x));
        let h = h.min(image.height().saturating_sub(y));
        if w == 0 || h == 0 {
            return None;
        }
        Some(imageops::crop_imm(image, x, y, w, h).to_image())
    }
}

impl fmt::Display for SearchRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{},{} {}x{}]",
            self.name, self.x, self.y, self.width, self.height
        )
    }
}
