// Synthetic images shared by the test suites

use image::{GrayImage, Luma, Rgb, RgbImage, imageops};

/// Deterministic noise pattern; shifted copies correlate poorly with the original
pub fn noise_template(width: u32, height: u32, seed: u32) -> GrayImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    GrayImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        Luma([((state >> 16) & 0xff) as u8])
    })
}

pub fn paste(canvas: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
    imageops::replace(canvas, patch, x as i64, y as i64);
}

/// Gray patch as an RGB image, so captures and grayscale templates line up
pub fn to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}
