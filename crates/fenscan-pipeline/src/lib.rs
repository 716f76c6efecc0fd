//! fenscan-pipeline: chess board detection and piece classification (sans-IO).
//!
//! Reads a chess position from a photograph through:
//! decode -> downsample -> grayscale -> blur -> Otsu threshold ->
//! Canny + dilation -> outer contours -> quadrilateral search ->
//! perspective warp -> 8x8 partition -> per-square classification ->
//! board assembly.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and decoded images and returns structured data. Piece
//! recognition is delegated to a [`PieceModel`] supplied by the caller;
//! loading models from disk and rendering FEN live in other crates.

pub mod assemble;
pub mod blur;
pub mod board;
pub mod classify;
pub mod contour;
pub mod corners;
pub mod debug;
pub mod detector;
pub mod diagnostics;
pub mod downsample;
pub mod edge;
pub mod grayscale;
pub mod homography;
pub mod partition;
pub mod pipeline;
pub mod polygon;
pub mod rectify;
pub mod threshold;
pub mod types;

#[cfg(test)]
mod test_support;

pub use board::{
    BoardOrientation, BoardState, Color, EMPTY_CLASS, ParseSquareError, Piece, PieceKind,
    PieceLabel, Square,
};
pub use classify::{
    ClassifyError, NormalizedTile, PieceClassifier, PieceModel, Prediction, TemplateModel,
};
pub use detector::BoardDetector;
pub use diagnostics::{Clock, PipelineDiagnostics, StageDiagnostics, StageMetrics};
pub use downsample::DownsampleFilter;
pub use partition::SquareTile;
pub use pipeline::{Pipeline, PipelineStage};
pub use types::{
    Corners, Detection, DetectorConfig, Dimensions, PipelineError, Point, StagedResult,
};

/// Read a chess position from encoded image bytes in one call.
///
/// Builds a [`BoardDetector`] from `model` and `config` and runs it on
/// `image_bytes`. `Ok(None)` means the picture holds no recognizable
/// board.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a bad config,
/// [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`] for
/// undecodable bytes, [`PipelineError::DegenerateGeometry`] when the
/// corners found cannot be warped, and [`PipelineError::Classification`]
/// when the model fails.
pub fn read_board<M: PieceModel>(
    image_bytes: &[u8],
    model: M,
    config: DetectorConfig,
) -> Result<Option<BoardState>, PipelineError> {
    BoardDetector::new(model, config)?.load_board_from_bytes(image_bytes)
}
