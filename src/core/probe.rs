//! Masks and search regions for template matching.
//!
//! The matcher itself lives in [`matching`] and needs the `vision` feature.

use image::imageops;
use image::{GrayImage, Luma, RgbImage, RgbaImage};
use imageproc::distance_transform::Norm;

#[cfg(feature = "vision")]
pub mod matching;
#[cfg(feature = "vision")]
pub use matching::{match_multiscale, match_template, ProbeMatch};

/// Channel value from which a pixel counts as background.
pub const WHITE_THRESHOLD: u8 = 240;

/// Marks pixels that are not near-white (and not transparent), then removes
/// speckles with a 3x3 opening.
pub fn nonwhite_mask(template: &RgbaImage, white_threshold: u8) -> GrayImage {
    let mut mask = GrayImage::new(template.width(), template.height());
    for (x, y, px) in template.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let white = r >= white_threshold && g >= white_threshold && b >= white_threshold;
        if !white && a > 0 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    imageproc::morphology::open(&mask, Norm::LInf, 1)
}

/// Mask of non-transparent pixels, or `None` when the template is fully opaque.
pub fn alpha_mask(template: &RgbaImage) -> Option<GrayImage> {
    if template.pixels().all(|p| p.0[3] == 255) {
        return None;
    }
    Some(GrayImage::from_fn(template.width(), template.height(), |x, y| {
        if template.get_pixel(x, y).0[3] > 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    }))
}

/// Crops the bottom `ratio` of the frame. Returns the crop and the y offset to
/// add back to coordinates found in it.
pub fn bottom_roi(image: &RgbImage, ratio: f32) -> (RgbImage, u32) {
    let ratio = if ratio.is_finite() { ratio.clamp(0.05, 1.0) } else { 1.0 };
    let height = image.height();
    let y0 = ((height as f32) * (1.0 - ratio)).floor() as u32;
    let y0 = y0.min(height.saturating_sub(1));
    let crop = imageops::crop_imm(image, 0, y0, image.width(), height - y0).to_image();
    (crop, y0)
}
