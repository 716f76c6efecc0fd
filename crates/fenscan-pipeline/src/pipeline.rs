//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use fenscan_pipeline::{DetectorConfig, Pipeline, PipelineError, PieceClassifier, PieceModel};
//! # fn run<M: PieceModel>(jpeg: Vec<u8>, classifier: &PieceClassifier<M>) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(jpeg, DetectorConfig::default())
//!     .decode()?
//!     .preprocess()
//!     .find_corners()?
//!     .rectify()?
//!     .partition()
//!     .classify(classifier)?
//!     .assemble()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or a
//! `Result` for fallible stages), carrying every previously computed
//! intermediate. Skipping or reordering stages is a compile error.
//!
//! Every stage from [`Preprocessed`] onward pins the original image and
//! the working rasters until [`Assembled::into_result`] hands them to
//! [`StagedResult`]. Callers that only need the board should use
//! [`BoardDetector`](crate::BoardDetector).

use image::DynamicImage;

use crate::board::{BoardState, Square};
use crate::classify::{PieceClassifier, PieceModel, Prediction};
use crate::corners::CornerSearch;
use crate::diagnostics::StageMetrics;
use crate::downsample::Downsampled;
use crate::partition::SquareTile;
use crate::types::{Corners, DetectorConfig, GrayImage, PipelineError, RgbImage, StagedResult};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing: call .decode() to continue"]
pub struct Pending {
    config: DetectorConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] for empty bytes and
    /// [`PipelineError::ImageDecode`] for unrecognized or corrupt data.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let source_len = self.source.len();
        let image = crate::grayscale::decode(&self.source)?;
        Ok(Decoded::new(self.config, &image, source_len))
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding: the original color image.
#[must_use = "pipeline stages are consumed by advancing: call .preprocess() to continue"]
pub struct Decoded {
    config: DetectorConfig,
    original: RgbImage,
    source_len: usize,
}

impl Decoded {
    fn new(config: DetectorConfig, image: &DynamicImage, source_len: usize) -> Self {
        Self {
            config,
            original: crate::grayscale::to_rgb(image),
            source_len,
        }
    }

    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Downsample, convert to grayscale, blur, binarize with Otsu, run
    /// Canny, and dilate the edges.
    pub fn preprocess(self) -> Preprocessed {
        let config = &self.config;
        let working = crate::downsample::downsample(
            &self.original,
            config.max_dimension,
            config.downsample_filter,
        );
        let gray = crate::grayscale::to_gray(&working.image);
        let smooth = crate::blur::gaussian_blur(&gray, config.blur_sigma);
        let (binary, otsu_level) = crate::threshold::otsu_binarize(&smooth);
        let raw_edges = crate::edge::canny(&binary, config.canny_low, config.canny_high);
        let edge_pixel_count = crate::edge::count_edge_pixels(&raw_edges);
        let edges = crate::edge::dilate(&raw_edges, config.dilate_radius);

        log::debug!(
            "preprocess: working {}x{} (downsampled: {}), otsu level {otsu_level}, {edge_pixel_count} edge pixels",
            working.image.width(),
            working.image.height(),
            working.applied(),
        );

        Preprocessed {
            config: self.config,
            original: self.original,
            source_len: self.source_len,
            working,
            binary,
            otsu_level,
            edges,
            edge_pixel_count,
        }
    }
}

// ───────────────────────── Stage 2: Preprocessed ─────────────────────

/// Pipeline state after preprocessing: binary image and dilated edges
/// at working resolution.
#[must_use = "pipeline stages are consumed by advancing: call .find_corners() to continue"]
pub struct Preprocessed {
    config: DetectorConfig,
    original: RgbImage,
    source_len: usize,
    working: Downsampled,
    binary: GrayImage,
    otsu_level: u8,
    edges: GrayImage,
    edge_pixel_count: u64,
}

impl Preprocessed {
    #[must_use]
    pub const fn working(&self) -> &RgbImage {
        &self.working.image
    }

    #[must_use]
    pub const fn binary(&self) -> &GrayImage {
        &self.binary
    }

    /// The dilated edge map contours are traced from.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    #[must_use]
    pub const fn otsu_level(&self) -> u8 {
        self.otsu_level
    }

    /// Search the edge map for the board outline and map its corners
    /// back to original-image coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoBoardDetected`] when no candidate
    /// qualifies.
    pub fn find_corners(self) -> Result<CornersFound, PipelineError> {
        let search = crate::corners::find_corners(&self.edges, &self.config)?;
        let corners = search
            .corners
            .scaled(self.working.scale_x, self.working.scale_y);
        Ok(CornersFound {
            prev: self,
            search,
            corners,
        })
    }
}

// ───────────────────────── Stage 3: CornersFound ─────────────────────

/// Pipeline state after the board outline has been located.
#[must_use = "pipeline stages are consumed by advancing: call .rectify() to continue"]
pub struct CornersFound {
    prev: Preprocessed,
    search: CornerSearch,
    corners: Corners,
}

impl CornersFound {
    /// Board corners in original-image coordinates.
    #[must_use]
    pub const fn corners(&self) -> &Corners {
        &self.corners
    }

    /// Corner search details in working-image coordinates.
    #[must_use]
    pub const fn search(&self) -> &CornerSearch {
        &self.search
    }

    /// Warp the board region of the original image to a square.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateGeometry`] when the corners
    /// do not span a convex quadrilateral.
    pub fn rectify(self) -> Result<Rectified, PipelineError> {
        let rectified = crate::rectify::warp_board(
            &self.prev.original,
            &self.corners,
            self.prev.config.output_size,
        )?;
        Ok(Rectified {
            prev: self,
            rectified,
        })
    }
}

// ───────────────────────── Stage 4: Rectified ────────────────────────

/// Pipeline state after perspective rectification.
#[must_use = "pipeline stages are consumed by advancing: call .partition() to continue"]
pub struct Rectified {
    prev: CornersFound,
    rectified: RgbImage,
}

impl Rectified {
    /// The top-down board image.
    #[must_use]
    pub const fn rectified(&self) -> &RgbImage {
        &self.rectified
    }

    /// Cut the rectified board into 64 tiles.
    pub fn partition(self) -> Partitioned {
        let tiles = crate::partition::extract_squares(
            &self.rectified,
            self.prev.prev.config.orientation,
        );
        Partitioned { prev: self, tiles }
    }
}

// ───────────────────────── Stage 5: Partitioned ──────────────────────

/// Pipeline state holding the 64 square tiles.
#[must_use = "pipeline stages are consumed by advancing: call .classify() to continue"]
pub struct Partitioned {
    prev: Rectified,
    tiles: Vec<SquareTile>,
}

impl Partitioned {
    #[must_use]
    pub fn tiles(&self) -> &[SquareTile] {
        &self.tiles
    }

    /// Classify every tile. The first failure aborts the request.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Classification`] if the model fails or
    /// returns malformed scores for any tile.
    pub fn classify<M: PieceModel>(
        self,
        classifier: &PieceClassifier<M>,
    ) -> Result<Classified, PipelineError> {
        let predictions = self
            .tiles
            .iter()
            .map(|tile| Ok((tile.square, classifier.classify(&tile.image)?)))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(Classified {
            prev: self.prev,
            tile_count: self.tiles.len(),
            predictions,
        })
    }
}

// ───────────────────────── Stage 6: Classified ───────────────────────

/// Pipeline state holding one prediction per square.
#[must_use = "pipeline stages are consumed by advancing: call .assemble() to continue"]
pub struct Classified {
    prev: Rectified,
    tile_count: usize,
    predictions: Vec<(Square, Prediction)>,
}

impl Classified {
    #[must_use]
    pub fn predictions(&self) -> &[(Square, Prediction)] {
        &self.predictions
    }

    /// Fold the predictions into a board.
    pub fn assemble(self) -> Assembled {
        let board = crate::assemble::assemble(
            self.predictions.iter().map(|(square, p)| (*square, p.label)),
        );
        Assembled { prev: self, board }
    }
}

// ───────────────────────── Stage 7: Assembled ────────────────────────

/// Final pipeline state.
#[must_use = "call .into_result() to take the staged result"]
pub struct Assembled {
    prev: Classified,
    board: BoardState,
}

impl Assembled {
    #[must_use]
    pub const fn board(&self) -> &BoardState {
        &self.board
    }

    /// Consume the pipeline, returning every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let classified = self.prev;
        let rectified = classified.prev;
        let corners_found = rectified.prev;
        let preprocessed = corners_found.prev;
        StagedResult {
            original: preprocessed.original,
            working: preprocessed.working.image,
            binary: preprocessed.binary,
            edges: preprocessed.edges,
            corners: corners_found.corners,
            rectified: rectified.rectified,
            predictions: classified.predictions,
            board: self.board,
        }
    }
}

// ──────────────────── PipelineStage trait ────────────────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 8;

/// Implemented by every stage, giving it a name, a position, and the
/// metrics describing the work done to reach it.
pub trait PipelineStage {
    /// Human-readable name of this stage (e.g. `"decode"`).
    const NAME: &str;

    /// Zero-based index (`0` for Pending through `7` for Assembled).
    const INDEX: usize;

    /// Metrics for the transition into this stage. `None` for
    /// [`Pending`], which has done no work.
    fn metrics(&self) -> Option<StageMetrics>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Decode {
            input_bytes: self.source_len,
            width: self.original.width(),
            height: self.original.height(),
        })
    }
}

impl PipelineStage for Preprocessed {
    const NAME: &str = "preprocess";
    const INDEX: usize = 2;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Preprocess {
            working_width: self.working.image.width(),
            working_height: self.working.image.height(),
            downsampled: self.working.applied(),
            otsu_level: self.otsu_level,
            edge_pixel_count: self.edge_pixel_count,
        })
    }
}

impl PipelineStage for CornersFound {
    const NAME: &str = "corners";
    const INDEX: usize = 3;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Corners {
            contour_count: self.search.contour_count,
            candidates_examined: self.search.candidates_examined,
            board_area: self.search.area,
            corners: self.corners,
        })
    }
}

impl PipelineStage for Rectified {
    const NAME: &str = "rectify";
    const INDEX: usize = 4;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Rectify {
            output_size: self.rectified.width(),
        })
    }
}

impl PipelineStage for Partitioned {
    const NAME: &str = "partition";
    const INDEX: usize = 5;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Partition {
            tile_count: self.tiles.len(),
            tile_size: self.tiles.first().map_or(0, |t| t.image.width()),
        })
    }
}

impl PipelineStage for Classified {
    const NAME: &str = "classify";
    const INDEX: usize = 6;

    fn metrics(&self) -> Option<StageMetrics> {
        let occupied = self
            .predictions
            .iter()
            .filter(|(_, p)| p.label.piece().is_some())
            .count();
        let min_confidence = self
            .predictions
            .iter()
            .map(|(_, p)| p.confidence)
            .fold(f32::INFINITY, f32::min);
        Some(StageMetrics::Classify {
            tiles: self.tile_count,
            occupied,
            min_confidence: if min_confidence.is_finite() {
                min_confidence
            } else {
                0.0
            },
        })
    }
}

impl PipelineStage for Assembled {
    const NAME: &str = "assemble";
    const INDEX: usize = 7;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Assemble {
            occupied: self.board.occupied_count(),
        })
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Store the source bytes and config without processing them.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: DetectorConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already-decoded image, skipping the decode stage.
    pub fn from_image(image: &DynamicImage, config: DetectorConfig) -> Decoded {
        Decoded::new(config, image, 0)
    }
}
