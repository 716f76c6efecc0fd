//! Perspective rectification of the board region into a square image.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, warp_into};

use crate::homography::Homography;
use crate::polygon;
use crate::types::{Corners, PipelineError, Point};

/// Minimum board area in source pixels for a quad to be warped.
const MIN_QUAD_AREA: f64 = 1.0;

/// Fill color for output pixels whose source falls outside the image.
const OUTSIDE: Rgb<u8> = Rgb([0, 0, 0]);

/// Destination corners of a `size x size` board: TL, TR, BR, BL.
#[must_use]
pub fn destination_corners(size: u32) -> [Point; 4] {
    let far = f64::from(size) - 1.0;
    [
        Point::new(0.0, 0.0),
        Point::new(far, 0.0),
        Point::new(far, far),
        Point::new(0.0, far),
    ]
}

/// Check that the corners describe a usable board: a convex, non-self-
/// intersecting quad with non-negligible area.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] describing the problem.
pub fn validate_quad(corners: &Corners) -> Result<(), PipelineError> {
    let pts = corners.points();
    if pts.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(PipelineError::DegenerateGeometry(
            "corner has a non-finite coordinate".to_string(),
        ));
    }
    let area = polygon::area(pts);
    if area < MIN_QUAD_AREA {
        return Err(PipelineError::DegenerateGeometry(format!(
            "board quad area {area:.2} is too small"
        )));
    }
    if !polygon::is_strictly_convex(pts, 1e-9 * area.max(1.0)) {
        return Err(PipelineError::DegenerateGeometry(
            "board quad is not convex".to_string(),
        ));
    }
    Ok(())
}

/// Warp the region bounded by `corners` in `image` to an
/// `output_size x output_size` top-down view.
///
/// Corner `TL` lands on `(0, 0)`, `TR` on `(size-1, 0)`, `BR` on
/// `(size-1, size-1)` and `BL` on `(0, size-1)`. Sampling is bilinear;
/// pixels mapping outside the source are black.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] if the corners fail
/// [`validate_quad`] or no homography exists for them.
pub fn warp_board(
    image: &RgbImage,
    corners: &Corners,
    output_size: u32,
) -> Result<RgbImage, PipelineError> {
    validate_quad(corners)?;
    let destination = destination_corners(output_size);
    let projection = Homography::from_correspondences(corners.points(), &destination)
        .and_then(|h| h.to_projection())
        .ok_or_else(|| {
            PipelineError::DegenerateGeometry("no homography for board corners".to_string())
        })?;

    let mut out = RgbImage::from_pixel(output_size, output_size, OUTSIDE);
    warp_into(image, &projection, Interpolation::Bilinear, OUTSIDE, &mut out);
    Ok(out)
}
