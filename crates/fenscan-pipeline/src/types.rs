//! Shared types for the fenscan detection pipeline.

use serde::{Deserialize, Serialize};

use crate::board::{BoardOrientation, BoardState, Square};
use crate::classify::{ClassifyError, Prediction};
use crate::downsample::DownsampleFilter;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`: the pipeline works on 3-channel color images.
pub use image::RgbImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// The four board corners in canonical order:
/// top-left, top-right, bottom-right, bottom-left.
///
/// The only way to build one from arbitrary points is
/// [`Corners::from_unordered`], which establishes the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corners([Point; 4]);

impl Corners {
    /// Order four points canonically.
    ///
    /// The two points with the smallest `y` form the top pair and the
    /// other two the bottom pair; each pair is then ordered by `x`.
    #[must_use]
    pub fn from_unordered(mut points: [Point; 4]) -> Self {
        points.sort_by(|a, b| a.y.total_cmp(&b.y));
        let (mut top, mut bottom) = ([points[0], points[1]], [points[2], points[3]]);
        top.sort_by(|a, b| a.x.total_cmp(&b.x));
        bottom.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self([top[0], top[1], bottom[1], bottom[0]])
    }

    #[must_use]
    pub const fn top_left(&self) -> Point {
        self.0[0]
    }

    #[must_use]
    pub const fn top_right(&self) -> Point {
        self.0[1]
    }

    #[must_use]
    pub const fn bottom_right(&self) -> Point {
        self.0[2]
    }

    #[must_use]
    pub const fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// The corners as `[TL, TR, BR, BL]`.
    #[must_use]
    pub const fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Map corners between images whose sizes differ by `sx` and `sy`.
    ///
    /// Pixel centres are matched rather than pixel origins, so a point at
    /// the centre of working pixel `i` lands at the centre of the block of
    /// original pixels that produced it. Used to bring corners found on the
    /// downsampled working image back to the original. Positive factors
    /// preserve the ordering.
    #[must_use]
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self(self.0.map(|p| {
            Point::new((p.x + 0.5).mul_add(sx, -0.5), (p.y + 0.5).mul_add(sy, -0.5))
        }))
    }
}

/// Configuration for the board detection pipeline.
///
/// Defaults are the tuned detector constants. Fields are
/// public; [`DetectorConfig::validate`] checks the invariants and is
/// called when a [`BoardDetector`](crate::BoardDetector) is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Images whose longest side exceeds this are downsampled before
    /// corner search. Aspect ratio is preserved.
    pub max_dimension: u32,

    /// Resampling filter used for that downsampling.
    pub downsample_filter: DownsampleFilter,

    /// Gaussian blur sigma applied to the grayscale image.
    pub blur_sigma: f32,

    /// Canny low (weak edge) threshold.
    pub canny_low: f32,

    /// Canny high (strong edge) threshold.
    pub canny_high: f32,

    /// Dilation radius (L-infinity) applied to the edge map. A radius of
    /// 2 is a 5x5 square, equivalent to two passes of a 3x3 kernel.
    pub dilate_radius: u8,

    /// How many of the largest external contours are tried as board
    /// outlines.
    pub max_candidates: usize,

    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_epsilon_ratio: f64,

    /// Minimum contour area (in working-image pixels) for a board outline.
    pub min_board_area: f64,

    /// Side length of the rectified board image.
    pub output_size: u32,

    /// Side length of the classifier input tile.
    pub tile_size: u32,

    /// Which side of the board faces the bottom edge of the photo.
    pub orientation: BoardOrientation,
}

impl DetectorConfig {
    pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
    pub const DEFAULT_DOWNSAMPLE_FILTER: DownsampleFilter = DownsampleFilter::Triangle;
    /// Sigma of a 5x5 Gaussian kernel when none is given explicitly.
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    pub const DEFAULT_DILATE_RADIUS: u8 = 2;
    pub const DEFAULT_MAX_CANDIDATES: usize = 10;
    pub const DEFAULT_APPROX_EPSILON_RATIO: f64 = 0.02;
    pub const DEFAULT_MIN_BOARD_AREA: f64 = 10_000.0;
    pub const DEFAULT_OUTPUT_SIZE: u32 = 800;
    pub const DEFAULT_TILE_SIZE: u32 = 32;

    /// Check the config invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first
    /// violated constraint.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |msg: String| Err(PipelineError::InvalidConfig(msg));
        if self.max_dimension == 0 {
            return fail("max_dimension must be positive".to_string());
        }
        if self.output_size < 8 {
            return fail(format!(
                "output_size must be at least 8, got {}",
                self.output_size
            ));
        }
        if self.tile_size == 0 {
            return fail("tile_size must be positive".to_string());
        }
        if self.max_candidates == 0 {
            return fail("max_candidates must be positive".to_string());
        }
        if !(self.approx_epsilon_ratio > 0.0 && self.approx_epsilon_ratio.is_finite()) {
            return fail(format!(
                "approx_epsilon_ratio must be positive, got {}",
                self.approx_epsilon_ratio
            ));
        }
        if self.min_board_area < 0.0 || !self.min_board_area.is_finite() {
            return fail(format!(
                "min_board_area must be non-negative, got {}",
                self.min_board_area
            ));
        }
        for (name, value) in [
            ("blur_sigma", self.blur_sigma),
            ("canny_low", self.canny_low),
            ("canny_high", self.canny_high),
        ] {
            if !value.is_finite() {
                return fail(format!("{name} must be finite, got {value}"));
            }
        }
        if self.canny_low > self.canny_high {
            return fail(format!(
                "canny_low ({}) exceeds canny_high ({})",
                self.canny_low, self.canny_high
            ));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            downsample_filter: Self::DEFAULT_DOWNSAMPLE_FILTER,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            dilate_radius: Self::DEFAULT_DILATE_RADIUS,
            max_candidates: Self::DEFAULT_MAX_CANDIDATES,
            approx_epsilon_ratio: Self::DEFAULT_APPROX_EPSILON_RATIO,
            min_board_area: Self::DEFAULT_MIN_BOARD_AREA,
            output_size: Self::DEFAULT_OUTPUT_SIZE,
            tile_size: Self::DEFAULT_TILE_SIZE,
            orientation: BoardOrientation::default(),
        }
    }
}

/// Result of a successful detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The recovered piece placement.
    pub board: BoardState,
    /// Board corners in original-image coordinates.
    pub corners: Corners,
    /// Dimensions of the decoded source image.
    pub dimensions: Dimensions,
}

/// Result of running the staged pipeline with every intermediate kept.
///
/// Intended for diagnostics and debug rendering; the core entry points
/// return only a [`Detection`] or [`BoardState`].
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Original decoded image.
    pub original: RgbImage,
    /// Working-resolution image the corner search ran on.
    pub working: RgbImage,
    /// Otsu-binarized working image.
    pub binary: GrayImage,
    /// Dilated edge map the contours were traced from.
    pub edges: GrayImage,
    /// Board corners in original-image coordinates.
    pub corners: Corners,
    /// Rectified top-down board image.
    pub rectified: RgbImage,
    /// One prediction per square, in partition order.
    pub predictions: Vec<(Square, Prediction)>,
    /// The assembled board.
    pub board: BoardState,
}

impl StagedResult {
    /// Drop the intermediates and keep the core result.
    #[must_use]
    pub fn detection(&self) -> Detection {
        Detection {
            board: self.board,
            corners: self.corners,
            dimensions: Dimensions {
                width: self.original.width(),
                height: self.original.height(),
            },
        }
    }
}

/// Errors that can occur while reading a board from an image.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Detector configuration is invalid.
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    /// No contour qualified as a board outline.
    #[error("no chess board detected in the image")]
    NoBoardDetected,

    /// The board corners do not span a usable quadrilateral.
    #[error("degenerate board geometry: {0}")]
    DegenerateGeometry(String),

    /// The piece classifier failed; no partial board is returned.
    #[error("piece classification failed: {0}")]
    Classification(#[from] ClassifyError),
}

impl PipelineError {
    /// Whether this is a "could not read the board" outcome rather than
    /// a genuine failure. Callers should ask for a better photo.
    #[must_use]
    pub const fn is_unreadable_board(&self) -> bool {
        matches!(self, Self::NoBoardDetected | Self::DegenerateGeometry(_))
    }
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` and [`ClassifyError`] carry their `Display`
/// string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidConfig(String),
    NoBoardDetected,
    DegenerateGeometry(String),
    Classification(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::NoBoardDetected => PipelineErrorProxy::NoBoardDetected,
            Self::DegenerateGeometry(s) => PipelineErrorProxy::DegenerateGeometry(s.clone()),
            Self::Classification(e) => PipelineErrorProxy::Classification(e.to_string()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed decode error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::NoBoardDetected => Self::NoBoardDetected,
            PipelineErrorProxy::DegenerateGeometry(s) => Self::DegenerateGeometry(s),
            PipelineErrorProxy::Classification(msg) => {
                Self::Classification(ClassifyError::Inference(msg))
            }
        })
    }
}
