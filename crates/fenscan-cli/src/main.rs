//! fenscan: read a chess position from a photo of a physical board.
//!
//! Runs the detection pipeline on an image file with a template-matching
//! piece model and prints the position as `{"fen": "..."}` on stdout.
//! When no board can be found it prints `{"fen": null}` and exits with
//! status 2. Useful beyond plain reading for:
//!
//! - Tuning the corner search (thresholds, dilation, candidate limits)
//! - Measuring per-stage durations with `--diagnostics`
//! - Inspecting edges, corners, and the rectified grid with `--debug-dir`
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin fenscan -- --templates <DIR> [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod templates;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use fenscan_fen::{Castling, FenOptions};
use fenscan_pipeline::diagnostics::{Clock, detect_with_diagnostics};
use fenscan_pipeline::{BoardDetector, BoardOrientation, DetectorConfig, StagedResult};

/// Exit status when the image holds no readable board.
const EXIT_NO_BOARD: u8 = 2;

/// Read a chess position from a board photo and print it as FEN.
#[derive(Parser)]
#[command(name = "fenscan", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Directory of labeled reference tiles (`wP.png`, `xx-1.png`, ...).
    #[arg(long)]
    templates: PathBuf,

    /// Longest side of the working image used for corner search.
    #[arg(
        long,
        default_value_t = DetectorConfig::DEFAULT_MAX_DIMENSION,
        value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..)
    )]
    max_dimension: u32,

    /// Downsample filter (disabled, nearest, triangle, catmull-rom, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    downsample_filter: Filter,

    /// Gaussian blur sigma.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Canny low threshold.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Edge dilation radius in pixels.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_DILATE_RADIUS)]
    dilate_radius: u8,

    /// Number of largest contours tried as the board outline.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_MAX_CANDIDATES)]
    max_candidates: usize,

    /// Polygon approximation tolerance as a fraction of perimeter.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_APPROX_EPSILON_RATIO)]
    approx_epsilon_ratio: f64,

    /// Minimum board outline area in working-image pixels.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_MIN_BOARD_AREA)]
    min_board_area: f64,

    /// Side length of the rectified board image.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_OUTPUT_SIZE)]
    output_size: u32,

    /// Side length of the classifier input tile.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_TILE_SIZE)]
    tile_size: u32,

    /// Which side of the board is nearest the bottom of the photo.
    #[arg(long, value_enum, default_value_t = Orientation::WhiteBottom)]
    orientation: Orientation,

    /// Full detector config as a JSON string.
    ///
    /// When provided, all other detector parameter flags are ignored.
    /// The JSON must be a valid `DetectorConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Side to move in the emitted FEN.
    #[arg(long, value_enum, default_value_t = Side::White)]
    side: Side,

    /// Grant castling rights when kings and rooks stand on their home squares.
    #[arg(long)]
    infer_castling: bool,

    /// Print a per-stage diagnostics report to stderr.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of the human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,

    /// Write edges.png, corners.png, and grid.png to this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Skip downsampling regardless of image size.
    Disabled,
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for fenscan_pipeline::DownsampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Disabled => Self::Disabled,
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

const fn filter_from_pipeline(f: fenscan_pipeline::DownsampleFilter) -> Filter {
    match f {
        fenscan_pipeline::DownsampleFilter::Disabled => Filter::Disabled,
        fenscan_pipeline::DownsampleFilter::Nearest => Filter::Nearest,
        fenscan_pipeline::DownsampleFilter::Triangle => Filter::Triangle,
        fenscan_pipeline::DownsampleFilter::CatmullRom => Filter::CatmullRom,
        fenscan_pipeline::DownsampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// Tracks [`DetectorConfig::DEFAULT_DOWNSAMPLE_FILTER`].
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(DetectorConfig::DEFAULT_DOWNSAMPLE_FILTER);

#[derive(Clone, Copy, ValueEnum)]
enum Orientation {
    WhiteBottom,
    BlackBottom,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    #[value(name = "w", alias = "white")]
    White,
    #[value(name = "b", alias = "black")]
    Black,
}

/// Build a [`DetectorConfig`] from CLI arguments.
///
/// `--config-json` wins over the individual flags.
fn config_from_cli(cli: &Cli) -> Result<DetectorConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(DetectorConfig {
        max_dimension: cli.max_dimension,
        downsample_filter: cli.downsample_filter.into(),
        blur_sigma: cli.blur_sigma,
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
        dilate_radius: cli.dilate_radius,
        max_candidates: cli.max_candidates,
        approx_epsilon_ratio: cli.approx_epsilon_ratio,
        min_board_area: cli.min_board_area,
        output_size: cli.output_size,
        tile_size: cli.tile_size,
        orientation: match cli.orientation {
            Orientation::WhiteBottom => BoardOrientation::WhiteBottom,
            Orientation::BlackBottom => BoardOrientation::BlackBottom,
        },
    })
}

const fn fen_options(cli: &Cli) -> FenOptions {
    FenOptions {
        side_to_move: match cli.side {
            Side::White => fenscan_fen::Color::White,
            Side::Black => fenscan_fen::Color::Black,
        },
        castling: if cli.infer_castling {
            Castling::FromPlacement
        } else {
            Castling::None
        },
        fullmove: FenOptions::DEFAULT_FULLMOVE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let model = match templates::load_template_model(&cli.templates, config.tile_size) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let detector = match BoardDetector::new(model, config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len()
    );

    match detect_with_diagnostics(image_bytes, &detector, &StdClock) {
        Ok((staged, diagnostics)) => {
            if cli.diagnostics {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => eprintln!("{json}"),
                        Err(e) => eprintln!("Error serializing diagnostics: {e}"),
                    }
                } else {
                    eprintln!("{}", diagnostics.report());
                }
            }
            if let Some(ref dir) = cli.debug_dir {
                write_debug_images(dir, &staged);
            }
            let fen = fenscan_fen::to_fen(&staged.board, &fen_options(&cli));
            println!("{}", serde_json::json!({ "fen": fen }));
            ExitCode::SUCCESS
        }
        Err(e) if e.is_unreadable_board() => {
            log::warn!("{e}");
            println!("{}", serde_json::json!({ "fen": null }));
            ExitCode::from(EXIT_NO_BOARD)
        }
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Save the edge map, annotated corners, and gridded board. Failures are
/// reported but do not change the exit status.
fn write_debug_images(dir: &Path, staged: &StagedResult) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Error creating {}: {e}", dir.display());
        return;
    }
    let corners = fenscan_pipeline::debug::annotate_corners(&staged.original, &staged.corners);
    let grid = fenscan_pipeline::debug::annotate_grid(&staged.rectified);
    let results = [
        ("edges.png", staged.edges.save(dir.join("edges.png"))),
        ("corners.png", corners.save(dir.join("corners.png"))),
        ("grid.png", grid.save(dir.join("grid.png"))),
    ];
    for (name, result) in results {
        match result {
            Ok(()) => eprintln!("Wrote {}", dir.join(name).display()),
            Err(e) => eprintln!("Error writing {name}: {e}"),
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
