//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`detect_with_diagnostics`] runs the staged pipeline and records how
//! long each stage took alongside the metrics the stage reports through
//! [`PipelineStage::metrics`]. Time comes from an injected [`Clock`] so
//! the library never reads the system clock itself.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::PieceModel;
use crate::detector::BoardDetector;
use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{Corners, PipelineError, StagedResult};

/// Source of timestamps for stage timing.
pub trait Clock {
    type Instant;

    fn now(&self) -> Self::Instant;

    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single successful detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    pub decode: StageDiagnostics,
    pub preprocess: StageDiagnostics,
    pub corners: StageDiagnostics,
    pub rectify: StageDiagnostics,
    pub partition: StageDiagnostics,
    pub classify: StageDiagnostics,
    pub assemble: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics; `None` if the stage reported none.
    pub metrics: Option<StageMetrics>,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    Decode {
        /// Size of the input image bytes (0 when started from an image).
        input_bytes: usize,
        width: u32,
        height: u32,
    },
    Preprocess {
        working_width: u32,
        working_height: u32,
        /// Whether the image was shrunk to the working resolution.
        downsampled: bool,
        otsu_level: u8,
        /// Canny edge pixels before dilation.
        edge_pixel_count: u64,
    },
    Corners {
        contour_count: usize,
        candidates_examined: usize,
        /// Area of the accepted outline in working-image pixels.
        board_area: f64,
        /// Corners in original-image coordinates.
        corners: Corners,
    },
    Rectify {
        output_size: u32,
    },
    Partition {
        tile_count: usize,
        tile_size: u32,
    },
    Classify {
        tiles: usize,
        occupied: usize,
        /// Lowest softmax probability among the chosen labels.
        min_confidence: f32,
    },
    Assemble {
        occupied: usize,
    },
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());
        lines.push(format!(
            "{:<14} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = diag
                .metrics
                .as_ref()
                .map_or_else(String::new, format_metrics);
            lines.push(format!("{name:<14} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }

    /// Stages in execution order with their display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Decode", &self.decode),
            ("Preprocess", &self.preprocess),
            ("Corners", &self.corners),
            ("Rectify", &self.rectify),
            ("Partition", &self.partition),
            ("Classify", &self.classify),
            ("Assemble", &self.assemble),
        ]
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Preprocess {
            working_width,
            working_height,
            downsampled,
            otsu_level,
            edge_pixel_count,
        } => format!(
            "{working_width}x{working_height}{} otsu={otsu_level} edges={edge_pixel_count}",
            if *downsampled { " (downsampled)" } else { "" }
        ),
        StageMetrics::Corners {
            contour_count,
            candidates_examined,
            board_area,
            corners,
        } => {
            let pts: Vec<String> = corners
                .points()
                .iter()
                .map(|p| format!("({:.0},{:.0})", p.x, p.y))
                .collect();
            format!(
                "{contour_count} contours, {candidates_examined} examined, area={board_area:.0} [{}]",
                pts.join(" ")
            )
        }
        StageMetrics::Rectify { output_size } => format!("{output_size}x{output_size}"),
        StageMetrics::Partition {
            tile_count,
            tile_size,
        } => format!("{tile_count} tiles of {tile_size}px"),
        StageMetrics::Classify {
            tiles,
            occupied,
            min_confidence,
        } => format!("{tiles} tiles, {occupied} occupied, min confidence {min_confidence:.3}"),
        StageMetrics::Assemble { occupied } => format!("{occupied} pieces"),
    }
}

/// Time one stage transition and capture the new stage's metrics.
fn timed<C, S, F>(clock: &C, run: F) -> Result<(S, StageDiagnostics), PipelineError>
where
    C: Clock,
    S: PipelineStage,
    F: FnOnce() -> Result<S, PipelineError>,
{
    let start = clock.now();
    let stage = run()?;
    let duration = clock.elapsed(&start);
    let metrics = stage.metrics();
    log::debug!("stage {} ({}) took {duration:?}", S::INDEX, S::NAME);
    Ok((stage, StageDiagnostics { duration, metrics }))
}

/// Run the full staged pipeline on `bytes` with the detector's config and
/// classifier, recording per-stage diagnostics.
///
/// # Errors
///
/// Returns the first stage failure, exactly as
/// [`BoardDetector::detect`] would.
pub fn detect_with_diagnostics<M: PieceModel, C: Clock>(
    bytes: Vec<u8>,
    detector: &BoardDetector<M>,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();
    let pending = Pipeline::new(bytes, detector.config().clone());

    let (decoded, decode) = timed(clock, || pending.decode())?;
    let (preprocessed, preprocess) = timed(clock, || Ok(decoded.preprocess()))?;
    let (found, corners) = timed(clock, || preprocessed.find_corners())?;
    let (rectified, rectify) = timed(clock, || found.rectify())?;
    let (partitioned, partition) = timed(clock, || Ok(rectified.partition()))?;
    let (classified, classify) = timed(clock, || partitioned.classify(detector.classifier()))?;
    let (assembled, assemble) = timed(clock, || Ok(classified.assemble()))?;

    let diagnostics = PipelineDiagnostics {
        decode,
        preprocess,
        corners,
        rectify,
        partition,
        classify,
        assemble,
        total_duration: clock.elapsed(&total_start),
    };
    Ok((assembled.into_result(), diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::board::BoardState;
    use crate::test_support::{ColorKeyModel, encode_png, render_board, render_photo};
    use crate::types::DetectorConfig;

    /// Advances one millisecond every time it is read.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn detector() -> BoardDetector<ColorKeyModel> {
        BoardDetector::new(ColorKeyModel::new(), DetectorConfig::default()).unwrap()
    }

    fn sample_png() -> Vec<u8> {
        let board = BoardState::empty()
            .with_piece_at("e1".parse().unwrap(), crate::board::Piece::from_symbol('K'))
            .with_piece_at("e8".parse().unwrap(), crate::board::Piece::from_symbol('k'));
        encode_png(&render_photo(&render_board(&board, 400), 560, 480, None))
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let clock = TickClock(Cell::new(0));
        let (staged, diag) = detect_with_diagnostics(sample_png(), &detector(), &clock).unwrap();
        assert_eq!(staged.board.occupied_count(), 2);

        assert!(matches!(
            diag.decode.metrics,
            Some(StageMetrics::Decode {
                width: 560,
                height: 480,
                ..
            })
        ));
        assert!(matches!(
            diag.partition.metrics,
            Some(StageMetrics::Partition {
                tile_count: 64,
                tile_size: 100
            })
        ));
        assert!(matches!(
            diag.assemble.metrics,
            Some(StageMetrics::Assemble { occupied: 2 })
        ));
        for (_, stage) in diag.stages() {
            assert_eq!(stage.duration, Duration::from_millis(1));
        }
        assert!(diag.total_duration >= Duration::from_millis(7));
    }

    #[test]
    fn report_names_each_stage() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) = detect_with_diagnostics(sample_png(), &detector(), &clock).unwrap();
        let report = diag.report();
        for name in [
            "Decode",
            "Preprocess",
            "Corners",
            "Rectify",
            "Partition",
            "Classify",
            "Assemble",
        ] {
            assert!(report.contains(name), "missing {name} in report:\n{report}");
        }
        assert!(report.contains("64 tiles of 100px"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) = detect_with_diagnostics(sample_png(), &detector(), &clock).unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!((json["decode"]["duration"].as_f64().unwrap() - 0.001).abs() < 1e-9);
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.assemble.metrics, diag.assemble.metrics);
    }

    #[test]
    fn failures_propagate() {
        let clock = TickClock(Cell::new(0));
        let blank = encode_png(&image::RgbImage::from_pixel(200, 200, image::Rgb([235, 235, 235])));
        assert!(matches!(
            detect_with_diagnostics(blank, &detector(), &clock),
            Err(PipelineError::NoBoardDetected)
        ));
    }
}
