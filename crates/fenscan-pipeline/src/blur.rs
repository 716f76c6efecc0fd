//! Gaussian blur for noise reduction before binarization.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. Sensor noise left in
//! the grayscale image would otherwise survive Otsu thresholding as
//! speckle and break the board outline into fragments.

use image::GrayImage;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc` panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
