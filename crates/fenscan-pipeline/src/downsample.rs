//! Downsampling large photos to a working resolution.
//!
//! Corner search only needs the board outline, so photos whose longest
//! side exceeds `max_dimension` are shrunk first. The scale factors are
//! returned so corners can be mapped back and the rectifier can sample
//! the full-resolution original.

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Resampling filter used when downsampling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality,
/// with a `Disabled` variant to skip downsampling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Skip downsampling regardless of image size.
    Disabled,
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl DownsampleFilter {
    const fn to_image_filter(self) -> Option<image::imageops::FilterType> {
        match self {
            Self::Disabled => None,
            Self::Nearest => Some(image::imageops::FilterType::Nearest),
            Self::Triangle => Some(image::imageops::FilterType::Triangle),
            Self::CatmullRom => Some(image::imageops::FilterType::CatmullRom),
            Self::Lanczos3 => Some(image::imageops::FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disabled => "Disabled",
            Self::Nearest => "Nearest",
            Self::Triangle => "Triangle",
            Self::CatmullRom => "CatmullRom",
            Self::Lanczos3 => "Lanczos3",
        })
    }
}

/// A possibly-downsampled image and the factors mapping its coordinates
/// back to the source image.
#[derive(Debug, Clone)]
pub struct Downsampled {
    pub image: RgbImage,
    /// Source width divided by working width.
    pub scale_x: f64,
    /// Source height divided by working height.
    pub scale_y: f64,
}

impl Downsampled {
    /// Whether the image was actually resized.
    #[must_use]
    pub fn applied(&self) -> bool {
        (self.scale_x - 1.0).abs() > f64::EPSILON || (self.scale_y - 1.0).abs() > f64::EPSILON
    }
}

/// Shrink `image` so its longest side is at most `max_dimension`.
///
/// Images already within bounds (or with the filter disabled) are
/// returned unchanged with unit scale.
#[must_use]
pub fn downsample(image: &RgbImage, max_dimension: u32, filter: DownsampleFilter) -> Downsampled {
    let (w, h) = image.dimensions();
    let unchanged = || Downsampled {
        image: image.clone(),
        scale_x: 1.0,
        scale_y: 1.0,
    };

    let Some(image_filter) = filter.to_image_filter() else {
        return unchanged();
    };
    if w.max(h) <= max_dimension || w == 0 || h == 0 {
        return unchanged();
    }

    let (new_w, new_h) = fit_within(w, h, max_dimension);
    let resized = image::imageops::resize(image, new_w, new_h, image_filter);
    Downsampled {
        image: resized,
        scale_x: f64::from(w) / f64::from(new_w),
        scale_y: f64::from(h) / f64::from(new_h),
    }
}

/// Largest size with the same aspect ratio whose longest side is `max`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fit_within(w: u32, h: u32, max: u32) -> (u32, u32) {
    let ratio = f64::from(max) / f64::from(w.max(h));
    let scale = |v: u32| ((f64::from(v) * ratio).round() as u32).max(1);
    (scale(w), scale(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([128, 128, 128]))
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(DownsampleFilter::default(), DownsampleFilter::Triangle);
    }

    #[test]
    fn no_downsample_when_already_small() {
        let result = downsample(&test_image(100, 80), 256, DownsampleFilter::Triangle);
        assert!(!result.applied());
        assert_eq!(result.image.dimensions(), (100, 80));
    }

    #[test]
    fn no_downsample_when_exact_match() {
        let result = downsample(&test_image(256, 200), 256, DownsampleFilter::Triangle);
        assert!(!result.applied());
        assert_eq!(result.image.dimensions(), (256, 200));
    }

    #[test]
    fn downsample_landscape_preserves_aspect() {
        let result = downsample(&test_image(2048, 1536), 1024, DownsampleFilter::Triangle);
        assert!(result.applied());
        assert_eq!(result.image.dimensions(), (1024, 768));
        assert!((result.scale_x - 2.0).abs() < 1e-9);
        assert!((result.scale_y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn downsample_portrait() {
        let result = downsample(&test_image(600, 1200), 256, DownsampleFilter::Nearest);
        assert_eq!(result.image.dimensions(), (128, 256));
    }

    #[test]
    fn disabled_filter_skips_large_image() {
        let result = downsample(&test_image(1024, 768), 256, DownsampleFilter::Disabled);
        assert!(!result.applied());
        assert_eq!(result.image.dimensions(), (1024, 768));
    }
}
