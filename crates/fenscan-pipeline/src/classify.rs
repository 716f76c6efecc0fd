//! Piece classification boundary.
//!
//! The model itself is external: anything implementing [`PieceModel`]
//! can be injected. This module owns the contract around it: tile
//! normalization, score validation, softmax, and argmax into a
//! [`PieceLabel`]. A deterministic nearest-template model is provided
//! for the CLI and for tests that need a real model without weights.

use std::sync::Arc;

use image::RgbImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::board::PieceLabel;

/// A square tile resized to the classifier input size with channel
/// values scaled to `[0, 1]`.
///
/// Data is row-major, channels interleaved (`HWC`, RGB).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTile {
    size: u32,
    data: Vec<f32>,
}

impl NormalizedTile {
    /// Resize `tile` to `size x size` and scale every channel by 1/255.
    #[must_use]
    pub fn from_rgb(tile: &RgbImage, size: u32) -> Self {
        let resized = if tile.dimensions() == (size, size) {
            tile.clone()
        } else {
            image::imageops::resize(tile, size, size, FilterType::Triangle)
        };
        let data = resized
            .as_raw()
            .iter()
            .map(|&v| f32::from(v) / 255.0)
            .collect();
        Self { size, data }
    }

    /// Side length in pixels.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Flat `HWC` buffer of `size * size * 3` values.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at pixel `(x, y)`, channel `c`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32, c: usize) -> Option<f32> {
        if x >= self.size || y >= self.size || c >= 3 {
            return None;
        }
        let idx = (y as usize * self.size as usize + x as usize) * 3 + c;
        self.data.get(idx).copied()
    }
}

/// Errors from the classification boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    /// The model reported a failure.
    #[error("model inference failed: {0}")]
    Inference(String),

    /// The model returned a different number of scores than it has classes.
    #[error("model returned {actual} scores for {expected} classes")]
    ScoreCount { expected: usize, actual: usize },

    /// A score was NaN or infinite.
    #[error("model returned a non-finite score")]
    NonFiniteScore,

    /// A class name is not one of the 13 known labels.
    #[error("unknown class name {0:?}")]
    UnknownClass(String),

    /// The model has no classes.
    #[error("model has no classes")]
    NoClasses,
}

/// A trained (or otherwise fixed) tile classifier.
///
/// Implementations must be deterministic: the same tile always yields
/// the same scores. The model is shared read-only across requests.
pub trait PieceModel: Send + Sync {
    /// Class names in score order: `wP`, `bK`, ..., `xx` for empty.
    fn class_names(&self) -> &[String];

    /// One raw score (logit) per class for the given tile.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Inference`] if the model cannot score
    /// the tile.
    fn infer(&self, tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError>;
}

impl<M: PieceModel + ?Sized> PieceModel for &M {
    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }

    fn infer(&self, tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError> {
        (**self).infer(tile)
    }
}

impl<M: PieceModel + ?Sized> PieceModel for Arc<M> {
    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }

    fn infer(&self, tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError> {
        (**self).infer(tile)
    }
}

impl<M: PieceModel + ?Sized> PieceModel for Box<M> {
    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }

    fn infer(&self, tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError> {
        (**self).infer(tile)
    }
}

/// The label chosen for one tile and its softmax probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: PieceLabel,
    pub confidence: f32,
}

/// Wraps a [`PieceModel`] with the tile contract: normalization to
/// `tile_size`, score validation, softmax, argmax.
#[derive(Debug, Clone)]
pub struct PieceClassifier<M> {
    model: M,
    tile_size: u32,
    labels: Vec<PieceLabel>,
}

impl<M: PieceModel> PieceClassifier<M> {
    /// Wrap `model`, resolving its class names once.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::NoClasses`] for a model without classes
    /// and [`ClassifyError::UnknownClass`] for a name outside the 13
    /// known labels.
    pub fn new(model: M, tile_size: u32) -> Result<Self, ClassifyError> {
        let names = model.class_names();
        if names.is_empty() {
            return Err(ClassifyError::NoClasses);
        }
        let labels = names
            .iter()
            .map(|n| {
                PieceLabel::from_class_name(n).ok_or_else(|| ClassifyError::UnknownClass(n.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            model,
            tile_size,
            labels,
        })
    }

    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Classify one square tile.
    ///
    /// Ties go to the class listed first.
    ///
    /// # Errors
    ///
    /// Propagates model failures and rejects score vectors of the wrong
    /// length or containing non-finite values.
    pub fn classify(&self, tile: &RgbImage) -> Result<Prediction, ClassifyError> {
        let input = NormalizedTile::from_rgb(tile, self.tile_size);
        let scores = self.model.infer(&input)?;
        if scores.len() != self.labels.len() {
            return Err(ClassifyError::ScoreCount {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ClassifyError::NonFiniteScore);
        }

        let probabilities = softmax(&scores);
        let (best, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |acc, (i, p)| if p > acc.1 { (i, p) } else { acc });
        Ok(Prediction {
            label: self.labels[best],
            confidence,
        })
    }
}

/// Numerically stable softmax.
#[must_use]
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Nearest-template classifier over labeled reference tiles.
///
/// Each class scores the negative mean squared difference between the
/// input and its closest reference, so an exact match scores 0 and
/// beats everything else.
#[derive(Debug, Clone)]
pub struct TemplateModel {
    class_names: Vec<String>,
    references: Vec<(usize, NormalizedTile)>,
}

impl TemplateModel {
    /// Build from `(class name, tile)` pairs. Classes are ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::NoClasses`] when empty,
    /// [`ClassifyError::UnknownClass`] for an invalid name, and
    /// [`ClassifyError::Inference`] when reference tiles differ in size.
    pub fn from_references<I>(references: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = (String, NormalizedTile)>,
    {
        let references: Vec<(String, NormalizedTile)> = references.into_iter().collect();
        let Some(size) = references.first().map(|(_, t)| t.size()) else {
            return Err(ClassifyError::NoClasses);
        };

        let mut class_names: Vec<String> = Vec::new();
        for (name, tile) in &references {
            if PieceLabel::from_class_name(name).is_none() {
                return Err(ClassifyError::UnknownClass(name.clone()));
            }
            if tile.size() != size {
                return Err(ClassifyError::Inference(format!(
                    "reference tile for {name} is {}px, expected {size}px",
                    tile.size()
                )));
            }
            if !class_names.contains(name) {
                class_names.push(name.clone());
            }
        }
        class_names.sort();

        let references = references
            .into_iter()
            .filter_map(|(name, tile)| {
                class_names
                    .iter()
                    .position(|n| *n == name)
                    .map(|idx| (idx, tile))
            })
            .collect();
        Ok(Self {
            class_names,
            references,
        })
    }

    /// Side length the reference tiles were normalized to.
    #[must_use]
    pub fn tile_size(&self) -> Option<u32> {
        self.references.first().map(|(_, t)| t.size())
    }
}

impl PieceModel for TemplateModel {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn infer(&self, tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError> {
        let mut best = vec![f32::INFINITY; self.class_names.len()];
        for (class, reference) in &self.references {
            if reference.size() != tile.size() {
                return Err(ClassifyError::Inference(format!(
                    "tile is {}px but references are {}px",
                    tile.size(),
                    reference.size()
                )));
            }
            let mse = mean_squared_difference(tile.data(), reference.data());
            if mse < best[*class] {
                best[*class] = mse;
            }
        }
        Ok(best.into_iter().map(|d| -d).collect())
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_squared_difference(a: &[f32], b: &[f32]) -> f32 {
    let sum: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    sum / a.len().max(1) as f32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::board::{Color, Piece, PieceKind};
    use image::Rgb;

    #[derive(Debug)]
    struct FixedScores {
        names: Vec<String>,
        scores: Vec<f32>,
    }

    impl FixedScores {
        fn new(names: &[&str], scores: &[f32]) -> Self {
            Self {
                names: names.iter().map(ToString::to_string).collect(),
                scores: scores.to_vec(),
            }
        }
    }

    impl PieceModel for FixedScores {
        fn class_names(&self) -> &[String] {
            &self.names
        }

        fn infer(&self, _tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError> {
            Ok(self.scores.clone())
        }
    }

    fn solid(value: u8, size: u32) -> RgbImage {
        RgbImage::from_pixel(size, size, Rgb([value, value, value]))
    }

    #[test]
    fn normalized_tile_scales_and_resizes() {
        let tile = NormalizedTile::from_rgb(&solid(255, 100), 32);
        assert_eq!(tile.size(), 32);
        assert_eq!(tile.data().len(), 32 * 32 * 3);
        assert!(tile.data().iter().all(|v| (v - 1.0).abs() < 1e-6));
        assert_eq!(tile.get(32, 0, 0), None);
        assert_eq!(tile.get(0, 0, 3), None);
    }

    #[test]
    fn softmax_sums_to_one_and_preserves_order() {
        let p = softmax(&[1.0, 3.0, 2.0]);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[1] > p[2] && p[2] > p[0]);
    }

    #[test]
    fn argmax_picks_highest_score() {
        let model = FixedScores::new(&["xx", "wK", "bQ"], &[0.1, 2.0, 0.5]);
        let classifier = PieceClassifier::new(model, 32).unwrap();
        let pred = classifier.classify(&solid(0, 50)).unwrap();
        assert_eq!(
            pred.label,
            PieceLabel::Occupied(Piece::new(Color::White, PieceKind::King))
        );
        assert!(pred.confidence > 0.5);
    }

    #[test]
    fn ties_go_to_first_class() {
        let model = FixedScores::new(&["bP", "xx"], &[1.0, 1.0]);
        let pred = PieceClassifier::new(model, 32)
            .unwrap()
            .classify(&solid(0, 8))
            .unwrap();
        assert_eq!(
            pred.label,
            PieceLabel::Occupied(Piece::new(Color::Black, PieceKind::Pawn))
        );
    }

    #[test]
    fn unknown_class_rejected_at_construction() {
        let model = FixedScores::new(&["xx", "wZ"], &[0.0, 0.0]);
        assert_eq!(
            PieceClassifier::new(model, 32).unwrap_err(),
            ClassifyError::UnknownClass("wZ".into())
        );
    }

    #[test]
    fn empty_model_rejected() {
        let model = FixedScores::new(&[], &[]);
        assert_eq!(
            PieceClassifier::new(model, 32).unwrap_err(),
            ClassifyError::NoClasses
        );
    }

    #[test]
    fn malformed_scores_rejected() {
        let wrong_len = FixedScores::new(&["xx", "wP"], &[1.0]);
        assert_eq!(
            PieceClassifier::new(wrong_len, 32)
                .unwrap()
                .classify(&solid(0, 8))
                .unwrap_err(),
            ClassifyError::ScoreCount {
                expected: 2,
                actual: 1
            }
        );

        let nan = FixedScores::new(&["xx", "wP"], &[1.0, f32::NAN]);
        assert_eq!(
            PieceClassifier::new(nan, 32)
                .unwrap()
                .classify(&solid(0, 8))
                .unwrap_err(),
            ClassifyError::NonFiniteScore
        );
    }

    #[test]
    fn shared_model_works_through_arc_and_ref() {
        let model = Arc::new(FixedScores::new(&["xx"], &[0.0]));
        let by_arc = PieceClassifier::new(Arc::clone(&model), 32).unwrap();
        let by_ref = PieceClassifier::new(&*model, 32).unwrap();
        assert_eq!(
            by_arc.classify(&solid(9, 8)).unwrap(),
            by_ref.classify(&solid(9, 8)).unwrap()
        );
    }

    #[test]
    fn template_model_matches_nearest_reference() {
        let refs = vec![
            ("xx".to_string(), NormalizedTile::from_rgb(&solid(110, 32), 32)),
            ("wP".to_string(), NormalizedTile::from_rgb(&solid(250, 32), 32)),
            ("bP".to_string(), NormalizedTile::from_rgb(&solid(10, 32), 32)),
            ("xx".to_string(), NormalizedTile::from_rgb(&solid(40, 32), 32)),
        ];
        let model = TemplateModel::from_references(refs).unwrap();
        assert_eq!(model.class_names(), ["bP", "wP", "xx"]);
        let classifier = PieceClassifier::new(model, 32).unwrap();

        assert_eq!(classifier.classify(&solid(45, 64)).unwrap().label, PieceLabel::Empty);
        assert_eq!(classifier.classify(&solid(105, 64)).unwrap().label, PieceLabel::Empty);
        assert_eq!(
            classifier.classify(&solid(240, 64)).unwrap().label,
            PieceLabel::Occupied(Piece::new(Color::White, PieceKind::Pawn))
        );
    }

    #[test]
    fn template_model_rejects_bad_references() {
        assert_eq!(
            TemplateModel::from_references(Vec::new()).unwrap_err(),
            ClassifyError::NoClasses
        );
        let refs = vec![("wX".to_string(), NormalizedTile::from_rgb(&solid(0, 4), 4))];
        assert!(matches!(
            TemplateModel::from_references(refs),
            Err(ClassifyError::UnknownClass(_))
        ));
        let mixed = vec![
            ("xx".to_string(), NormalizedTile::from_rgb(&solid(0, 4), 4)),
            ("wP".to_string(), NormalizedTile::from_rgb(&solid(0, 8), 8)),
        ];
        assert!(matches!(
            TemplateModel::from_references(mixed),
            Err(ClassifyError::Inference(_))
        ));
    }
}
