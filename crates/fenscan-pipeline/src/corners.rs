//! Locating the board outline among the edge-map contours.
//!
//! The board is taken to be the largest external contour that
//! approximates to exactly four vertices and encloses more than
//! `min_board_area` pixels. Only the `max_candidates` largest contours
//! are examined, in descending area order.

use image::GrayImage;

use crate::contour::{Contour, external_contours};
use crate::polygon;
use crate::types::{Corners, DetectorConfig, PipelineError};

/// Outcome of a successful corner search, in working-image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CornerSearch {
    pub corners: Corners,
    /// Area of the contour that was accepted.
    pub area: f64,
    /// External contours found in the edge map.
    pub contour_count: usize,
    /// Candidates approximated before one was accepted.
    pub candidates_examined: usize,
}

/// Find the board corners in a dilated edge map.
///
/// # Errors
///
/// Returns [`PipelineError::NoBoardDetected`] when no candidate
/// qualifies.
pub fn find_corners(
    edges: &GrayImage,
    config: &DetectorConfig,
) -> Result<CornerSearch, PipelineError> {
    let contours = external_contours(edges);
    let contour_count = contours.len();
    log::debug!("corner search: {contour_count} external contours");

    let (corners, area, candidates_examined) =
        select_board_quad(contours, config).ok_or(PipelineError::NoBoardDetected)?;
    log::debug!(
        "board outline accepted after {candidates_examined} candidate(s): area {area:.0}, corners {:?}",
        corners.points()
    );

    Ok(CornerSearch {
        corners,
        area,
        contour_count,
        candidates_examined,
    })
}

/// Pick the board quad from traced contours.
///
/// Returns the ordered corners, the contour's area, and how many
/// candidates were examined, or `None` if none qualifies.
#[must_use]
pub fn select_board_quad(
    contours: Vec<Contour>,
    config: &DetectorConfig,
) -> Option<(Corners, f64, usize)> {
    let mut by_area: Vec<(f64, Contour)> = contours.into_iter().map(|c| (c.area(), c)).collect();
    by_area.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (examined, (area, contour)) in by_area.into_iter().take(config.max_candidates).enumerate() {
        if area <= config.min_board_area {
            // Sorted by area, so nothing later can qualify either.
            return None;
        }
        let epsilon = config.approx_epsilon_ratio * contour.perimeter();
        let approx = polygon::approximate_closed(contour.points(), epsilon);
        log::trace!(
            "candidate {examined}: area {area:.0}, {} points -> {} vertices",
            contour.len(),
            approx.len()
        );
        if let [a, b, c, d] = approx[..] {
            return Some((Corners::from_unordered([a, b, c, d]), area, examined + 1));
        }
    }
    None
}
