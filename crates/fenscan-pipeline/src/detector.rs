//! The board detector: a validated config plus an injected piece model.

use image::{DynamicImage, RgbImage};

use crate::board::BoardState;
use crate::classify::{PieceClassifier, PieceModel};
use crate::partition::SquareTile;
use crate::pipeline::Pipeline;
use crate::types::{Corners, Detection, DetectorConfig, PipelineError};

/// Reads chess positions from photographs.
///
/// Built once with a model and shared read-only; every method takes
/// `&self`, and the detector is `Send + Sync` because the model is.
#[derive(Debug, Clone)]
pub struct BoardDetector<M> {
    config: DetectorConfig,
    classifier: PieceClassifier<M>,
}

impl<M: PieceModel> BoardDetector<M> {
    /// Validate `config` and wrap `model`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an invalid config and
    /// [`PipelineError::Classification`] if the model's class names are
    /// not all known labels.
    pub fn new(model: M, config: DetectorConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let classifier = PieceClassifier::new(model, config.tile_size)?;
        Ok(Self { config, classifier })
    }

    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    #[must_use]
    pub const fn classifier(&self) -> &PieceClassifier<M> {
        &self.classifier
    }

    /// Run the full pipeline on a decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoBoardDetected`] when no board outline
    /// is found, [`PipelineError::DegenerateGeometry`] for unusable
    /// corners, and [`PipelineError::Classification`] when the model
    /// fails on any square.
    pub fn detect(&self, image: &DynamicImage) -> Result<Detection, PipelineError> {
        let staged = Pipeline::from_image(image, self.config.clone())
            .preprocess()
            .find_corners()?
            .rectify()?
            .partition()
            .classify(&self.classifier)?
            .assemble()
            .into_result();
        let detection = staged.detection();
        log::info!(
            "board detected in {}x{} image: {} pieces",
            detection.dimensions.width,
            detection.dimensions.height,
            detection.board.occupied_count()
        );
        Ok(detection)
    }

    /// Read the board from a decoded image.
    ///
    /// Returns `Ok(None)` when no board could be found in the picture;
    /// every other failure is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateGeometry`] or
    /// [`PipelineError::Classification`] as [`detect`](Self::detect).
    pub fn load_board_from_image(
        &self,
        image: &DynamicImage,
    ) -> Result<Option<BoardState>, PipelineError> {
        match self.detect(image) {
            Ok(detection) => Ok(Some(detection.board)),
            Err(PipelineError::NoBoardDetected) => {
                log::warn!("no chess board found in image");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Decode `bytes` and read the board.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`] for undecodable input, then as
    /// [`load_board_from_image`](Self::load_board_from_image).
    pub fn load_board_from_bytes(&self, bytes: &[u8]) -> Result<Option<BoardState>, PipelineError> {
        let image = crate::grayscale::decode(bytes)?;
        self.load_board_from_image(&image)
    }

    /// Locate the board corners only, in original-image coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoBoardDetected`] when no candidate
    /// qualifies.
    pub fn find_corners(&self, image: &DynamicImage) -> Result<Corners, PipelineError> {
        let found = Pipeline::from_image(image, self.config.clone())
            .preprocess()
            .find_corners()?;
        Ok(*found.corners())
    }

    /// Warp the board bounded by `corners` to the configured output size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateGeometry`] for unusable corners.
    pub fn warp_board(
        &self,
        image: &RgbImage,
        corners: &Corners,
    ) -> Result<RgbImage, PipelineError> {
        crate::rectify::warp_board(image, corners, self.config.output_size)
    }

    /// Cut a rectified board into tiles using the configured orientation.
    #[must_use]
    pub fn extract_squares(&self, board: &RgbImage) -> Vec<SquareTile> {
        crate::partition::extract_squares(board, self.config.orientation)
    }
}
