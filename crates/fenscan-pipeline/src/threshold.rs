//! Otsu binarization.
//!
//! The threshold comes from [`imageproc::contrast::otsu_level`], which
//! picks the level minimizing intra-class variance. No manual tuning.

use image::{GrayImage, Luma};

/// Binarize with Otsu's global threshold.
///
/// Pixels strictly brighter than the level become 255, the rest 0.
/// Returns the binary image and the chosen level.
#[must_use]
pub fn otsu_binarize(image: &GrayImage) -> (GrayImage, u8) {
    let level = imageproc::contrast::otsu_level(image);
    let binary = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    (binary, level)
}
