//! Debug overlays for inspecting detections.
//!
//! Nothing in the detection path calls these; they draw on copies of
//! the staged intermediates so a caller can see what the detector saw.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::partition::GRID;
use crate::types::Corners;

const OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);
const GRID_LINE: Rgb<u8> = Rgb([255, 0, 0]);

/// Marker colors for TL, TR, BR, BL.
const CORNER_COLORS: [Rgb<u8>; 4] = [
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 0, 0]),
    Rgb([255, 255, 0]),
];

const CORNER_RADIUS: i32 = 10;

/// Copy of `image` with the board outline and a colored dot on each
/// corner (TL green, TR blue, BR red, BL yellow).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn annotate_corners(image: &RgbImage, corners: &Corners) -> RgbImage {
    let mut out = image.clone();
    let pts = corners.points();
    for i in 0..4 {
        let (a, b) = (pts[i], pts[(i + 1) % 4]);
        draw_line_segment_mut(
            &mut out,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            OUTLINE,
        );
    }
    for (p, color) in pts.iter().zip(CORNER_COLORS) {
        draw_filled_circle_mut(
            &mut out,
            (p.x.round() as i32, p.y.round() as i32),
            CORNER_RADIUS,
            color,
        );
    }
    out
}

/// Copy of a rectified board with the 8x8 tile boundaries drawn.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn annotate_grid(rectified: &RgbImage) -> RgbImage {
    let mut out = rectified.clone();
    let (w, h) = out.dimensions();
    let (tile_w, tile_h) = (w / GRID, h / GRID);
    for i in 0..=GRID {
        let x = (i * tile_w).min(w.saturating_sub(1)) as f32;
        let y = (i * tile_h).min(h.saturating_sub(1)) as f32;
        draw_line_segment_mut(&mut out, (x, 0.0), (x, h as f32 - 1.0), GRID_LINE);
        draw_line_segment_mut(&mut out, (0.0, y), (w as f32 - 1.0, y), GRID_LINE);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    #[test]
    fn corner_markers_are_drawn_in_order() {
        let img = RgbImage::new(200, 200);
        let corners = Corners::from_unordered([
            Point::new(20.0, 20.0),
            Point::new(180.0, 20.0),
            Point::new(180.0, 180.0),
            Point::new(20.0, 180.0),
        ]);
        let out = annotate_corners(&img, &corners);
        assert_eq!(*out.get_pixel(20, 20), CORNER_COLORS[0]);
        assert_eq!(*out.get_pixel(180, 20), CORNER_COLORS[1]);
        assert_eq!(*out.get_pixel(180, 180), CORNER_COLORS[2]);
        assert_eq!(*out.get_pixel(20, 180), CORNER_COLORS[3]);
        assert_eq!(*out.get_pixel(100, 20), OUTLINE);
        assert_eq!(*out.get_pixel(100, 100), Rgb([0, 0, 0]));
    }

    #[test]
    fn grid_lines_fall_on_tile_boundaries() {
        let img = RgbImage::new(80, 80);
        let out = annotate_grid(&img);
        assert_eq!(*out.get_pixel(10, 5), GRID_LINE);
        assert_eq!(*out.get_pixel(5, 40), GRID_LINE);
        assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
        assert_eq!(out.dimensions(), (80, 80));
    }
}
