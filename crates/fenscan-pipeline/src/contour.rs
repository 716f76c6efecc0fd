//! External contour extraction from a binary edge map.
//!
//! Uses Suzuki-Abe border following from
//! `imageproc::contours::find_contours` and keeps only outermost borders:
//! contours of holes and of shapes nested inside another shape are
//! discarded, so the grid lines and pieces inside a board never compete
//! with the board's own outline.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::polygon;
use crate::types::Point;

/// A closed contour traced around a connected region of edge pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed area in square pixels.
    #[must_use]
    pub fn area(&self) -> f64 {
        polygon::area(&self.points)
    }

    /// Closed perimeter length in pixels.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        polygon::perimeter(&self.points)
    }
}

/// Trace the outermost contours in `edges`.
///
/// Non-zero pixels are foreground. Only outer borders without a parent
/// are returned, in tracing order.
#[must_use]
pub fn external_contours(edges: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<u32>(edges)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            Contour::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                    .collect(),
            )
        })
        .collect()
}
