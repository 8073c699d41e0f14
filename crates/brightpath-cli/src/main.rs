//! brightpath: CLI for brightest-path tracing and wavefront tracking.
//!
//! Two subcommands:
//!
//! - `trace` connects clicked points on one image with brightest paths
//!   and reports the brightness profile along the traced line.
//! - `wavefront` traces the line on the first frame of a directory, then
//!   follows the wavefront along it across every frame and writes CSV.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin brightpath -- trace image.png --point 10,40 --point 200,45
//! cargo run --release --bin brightpath -- wavefront frames/ --point 10,40 --point 200,45 --output out.csv
//! ```
//!
//! Set `RUST_LOG=brightpath_core=debug` for search and selection logs.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path as FsPath, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use brightpath_core::{
    AnalyzerConfig, Coord, Frame, Path, SearchConfig, Session, SessionConfig, SmoothingMode,
    TracerKind, analyze_frames, profile,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{Rgb, RgbImage};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// File extensions treated as frames when reading a directory.
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp"];

/// Radius of the click markers drawn on overlays.
const CLICK_MARKER_RADIUS: i32 = 3;

/// Brightest-path tracing and wavefront tracking over image sequences.
#[derive(Parser)]
#[command(name = "brightpath", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace a line through clicked points on one image.
    Trace(TraceArgs),
    /// Track the wavefront along a traced line across a directory of frames.
    Wavefront(WavefrontArgs),
}

/// Options shared by every subcommand that traces a line.
#[derive(Args)]
struct LineArgs {
    /// A clicked point as `X,Y`. Repeat for each click, in order.
    #[arg(long = "point", value_parser = parse_point, required = true)]
    points: Vec<Coord>,

    /// Strategy connecting consecutive points.
    #[arg(long, value_enum, default_value_t = Tracer::Brightest)]
    tracer: Tracer,

    /// Cost of entering a black pixel.
    #[arg(long, default_value_t = SearchConfig::DEFAULT_N0)]
    n0: f64,

    /// Intensity increase that halves the cost of entering a pixel.
    #[arg(long, default_value_t = SearchConfig::DEFAULT_T_HALF)]
    t_half: f64,
}

#[derive(Args)]
struct TraceArgs {
    /// Path to the input image.
    image_path: PathBuf,

    #[command(flatten)]
    line: LineArgs,

    /// Write a copy of the image with the traced line and clicks drawn on it.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Output the trace as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WavefrontArgs {
    /// Directory of frames, ordered by modification time then name.
    frames_dir: PathBuf,

    #[command(flatten)]
    line: LineArgs,

    /// Smoothing applied to every brightness profile.
    #[arg(long, value_enum, default_value_t = Mode::MovingAverage)]
    mode: Mode,

    /// Box-filter width for moving-average and gradient smoothing.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_WINDOW_SIZE, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    window_size: usize,

    /// Standard deviation for Gaussian smoothing.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_SIGMA)]
    sigma: f64,

    /// Per-sample bonus favoring positions farther along the line.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_WEIGHT_FACTOR, allow_negative_numbers = true)]
    weight_factor: f64,

    /// Disk-averaging radius applied to each frame before sampling.
    #[arg(long, default_value_t = 0)]
    radius: u32,

    /// Full analyzer config as a JSON string.
    ///
    /// When provided, `--mode`, `--window-size`, `--sigma` and
    /// `--weight-factor` are ignored. The JSON must be a valid
    /// `AnalyzerConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the wavefront CSV to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output the wavefront as JSON instead of CSV.
    #[arg(long)]
    json: bool,
}

/// Line tracer selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// Dijkstra search favoring bright pixels.
    Brightest,
    /// Bresenham straight line.
    Straight,
}

/// Smoothing mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Box filter ("valid" convolution).
    MovingAverage,
    /// Gaussian filter with reflected boundaries.
    Gaussian,
    /// Gradient of the moving average.
    Gradient,
    /// No smoothing.
    Raw,
}

/// JSON shape of a `trace` run.
#[derive(Serialize)]
struct TraceReport<'a> {
    clicks: &'a [Coord],
    line: &'a Path,
    profile: &'a [f64],
}

/// Parse `X,Y` into a [`Coord`].
fn parse_point(s: &str) -> Result<Coord, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got `{s}`"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in `{s}`: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in `{s}`: {e}"))?;
    Ok(Coord::new(x, y))
}

/// Build a [`SessionConfig`] from the line options.
fn session_config(args: &LineArgs) -> Result<SessionConfig, String> {
    let tracer = match args.tracer {
        Tracer::Brightest => {
            let search = SearchConfig {
                n0: args.n0,
                t_half: args.t_half,
            };
            search.validate().map_err(|e| format!("Invalid search weights: {e}"))?;
            TracerKind::BrightestPath(search)
        }
        Tracer::Straight => TracerKind::StraightLine,
    };
    Ok(SessionConfig { tracer })
}

/// Build an [`AnalyzerConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual analyzer flags are ignored.
fn analyzer_config(args: &WavefrontArgs) -> Result<AnalyzerConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnalyzerConfig {
        mode: match args.mode {
            Mode::MovingAverage => SmoothingMode::MovingAverage,
            Mode::Gaussian => SmoothingMode::Gaussian,
            Mode::Gradient => SmoothingMode::Gradient,
            Mode::Raw => SmoothingMode::Raw,
        },
        window_size: args.window_size,
        sigma: args.sigma,
        weight_factor: args.weight_factor,
    })
}

fn load_frame(path: &FsPath) -> Result<(Frame, image::DynamicImage), String> {
    let image = image::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let frame = Frame::from_dynamic(&image).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((frame, image))
}

/// Image files in `dir`, ordered by modification time then file name.
fn list_frames(dir: &FsPath) -> Result<Vec<PathBuf>, String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Error reading {}: {e}", dir.display()))?;

    let mut frames: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Error reading {}: {e}", dir.display()))?;
        let path = entry.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                FRAME_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            });
        if !is_frame || !path.is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        frames.push((modified, path));
    }

    frames.sort_by(|(ta, pa), (tb, pb)| ta.cmp(tb).then_with(|| pa.file_name().cmp(&pb.file_name())));
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// Click every point on `frame` in order and return the traced line.
fn trace_line(frame: Frame, args: &LineArgs) -> Result<Path, String> {
    if args.points.len() < 2 {
        return Err("At least two --point values are needed to trace a line".to_owned());
    }

    let mut session = Session::new(session_config(args)?);
    session.open(frame);
    for &point in &args.points {
        session
            .click(point)
            .map_err(|e| format!("Error at point {point}: {e}"))?;
    }
    session.wait();

    let traced = session.with_state(|state| {
        state
            .history()
            .trail()
            .iter()
            .filter(|node| node.has_child())
            .count()
    });
    let segments = args.points.len() - 1;
    if traced < segments {
        return Err(format!(
            "No path found for {} of {segments} segments",
            segments - traced
        ));
    }
    Ok(session.traced_line())
}

fn draw_overlay(image: &image::DynamicImage, line: &Path, clicks: &[Coord]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for coord in line.coords() {
        canvas.put_pixel(coord.x, coord.y, Rgb([255, 0, 0]));
    }
    for click in clicks {
        #[allow(clippy::cast_possible_wrap)]
        imageproc::drawing::draw_filled_circle_mut(
            &mut canvas,
            (click.x as i32, click.y as i32),
            CLICK_MARKER_RADIUS,
            Rgb([0, 0, 0]),
        );
    }
    canvas
}

fn run_trace(args: &TraceArgs) -> Result<(), String> {
    let (frame, image) = load_frame(&args.image_path)?;
    info!(path = %args.image_path.display(), "loaded image");

    let line = trace_line(frame.clone(), &args.line)?;
    let profile = profile::sample_profile(&frame, &line).map_err(|e| e.to_string())?;

    if args.json {
        let report = TraceReport {
            clicks: &args.line.points,
            line: &line,
            profile: &profile,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Error serializing trace: {e}"))?;
        println!("{json}");
    } else {
        println!("Traced {} pixels through {} clicks", line.len(), args.line.points.len());
        for (i, (coord, value)) in line.coords().iter().zip(&profile).enumerate() {
            let at = coord.to_string();
            println!("{i:>6} {at:<14} {value:>7.2}");
        }
    }

    if let Some(ref overlay_path) = args.overlay {
        draw_overlay(&image, &line, &args.line.points)
            .save(overlay_path)
            .map_err(|e| format!("Error writing overlay to {}: {e}", overlay_path.display()))?;
        eprintln!("Overlay written to {}", overlay_path.display());
    }
    Ok(())
}

fn run_wavefront(args: &WavefrontArgs) -> Result<(), String> {
    let config = analyzer_config(args)?;
    let paths = list_frames(&args.frames_dir)?;
    if paths.is_empty() {
        return Err(format!("No image frames in {}", args.frames_dir.display()));
    }

    let frames = paths
        .iter()
        .map(|path| load_frame(path).map(|(frame, _)| frame))
        .collect::<Result<Vec<_>, _>>()?;
    eprintln!("Frames: {} from {}", frames.len(), args.frames_dir.display());
    eprintln!("Config: {config:#?}");

    let line = trace_line(frames[0].clone(), &args.line)?;
    eprintln!("Traced line: {} pixels", line.len());

    let wavefront = analyze_frames(&frames, &line, args.radius, &config)
        .map_err(|e| format!("Analysis error: {e}"))?;
    info!(direction = ?wavefront.direction, total = wavefront.total, "wavefront selected");

    let output = if args.json {
        serde_json::to_string_pretty(&wavefront)
            .map_err(|e| format!("Error serializing wavefront: {e}"))?
    } else {
        brightpath_export::to_csv(&wavefront)
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            eprintln!("Wavefront written to {} ({} bytes)", path.display(), output.len());
        }
        None => print!("{output}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Trace(args) => run_trace(args),
        Command::Wavefront(args) => run_wavefront(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
