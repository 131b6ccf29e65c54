//! plotline: turn a raster line drawing into a plotter-ready SVG.
//!
//! Reads an image, extracts the centerline of every stroke, fits smooth
//! curves through it and writes a single-stroke SVG. Optionally maps the
//! drawing onto a physical canvas in millimetres.
//!
//! # Usage
//!
//! ```text
//! plotline [OPTIONS] <INPUT> <OUTPUT>
//! plotline drawing.png drawing.svg --canvas-width 115 --canvas-height 85
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use plotline_export::SvgMetadata;
use plotline_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use plotline_pipeline::{CanvasSize, PipelineConfig, PipelineError, ProcessResult};

/// Centerline vectorizer for pen plotters.
///
/// Thresholds the input, thins every stroke to a one-pixel skeleton,
/// traces and simplifies it, and writes smooth cubic Bezier paths.
#[derive(Parser)]
#[command(name = "plotline", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Path of the SVG file to write.
    output: PathBuf,

    /// Strokes shorter than this many pixels are dropped.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_LENGTH)]
    min_length: f64,

    /// Pixels at or below this intensity (0-255) are ink.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD, allow_negative_numbers = true)]
    threshold: i32,

    /// Simplification tolerance in pixels; higher is smoother.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SMOOTHNESS)]
    smoothness: f64,

    /// Physical canvas width in millimetres.
    #[arg(long, requires = "canvas_height", allow_negative_numbers = true)]
    canvas_width: Option<f64>,

    /// Physical canvas height in millimetres.
    #[arg(long, requires = "canvas_width", allow_negative_numbers = true)]
    canvas_height: Option<f64>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,

    /// Print per-stage diagnostics (text to stderr, JSON to stdout).
    #[arg(long, value_enum)]
    diagnostics: Option<DiagnosticsFormat>,

    /// Omit the title, description and embedded config from the SVG.
    #[arg(long)]
    no_metadata: bool,
}

/// Diagnostics report format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DiagnosticsFormat {
    /// Human-readable table.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Everything that can make a run fail.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, CliError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(CliError::ConfigJson);
    }

    let canvas = match (cli.canvas_width, cli.canvas_height) {
        (Some(width_mm), Some(height_mm)) => Some(CanvasSize {
            width_mm,
            height_mm,
        }),
        _ => None,
    };

    Ok(PipelineConfig {
        threshold: cli.threshold,
        min_length: cli.min_length,
        smoothness: cli.smoothness,
        canvas,
    })
}

/// Human-readable parameter summary for the SVG `<desc>`.
fn describe(config: &PipelineConfig) -> String {
    let mut desc = format!(
        "threshold={} min-length={} smoothness={}",
        config.threshold, config.min_length, config.smoothness
    );
    if let Some(canvas) = config.canvas {
        let _ = write!(desc, " canvas={}x{}mm", canvas.width_mm, canvas.height_mm);
    }
    desc
}

/// Write `contents` to a fresh `<path>.tmp` and rename it into place, so
/// a failed write never leaves a truncated document at `path`.
///
/// An existing `<path>.tmp` is an error and is left untouched. The temp
/// file is removed if writing or renaming fails.
fn write_atomically(path: &Path, contents: &str) -> Result<(), CliError> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let to_error = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)
        .map_err(to_error)?;
    let written = file
        .write_all(contents.as_bytes())
        .and_then(|()| file.sync_all());
    drop(file);

    if let Err(e) = written.and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(to_error(e));
    }
    Ok(())
}

/// Run the pipeline, collecting diagnostics only when asked for.
fn vectorize(
    bytes: &[u8],
    config: &PipelineConfig,
    want_diagnostics: bool,
) -> Result<(ProcessResult, Option<PipelineDiagnostics>), PipelineError> {
    if want_diagnostics {
        let (staged, diagnostics) =
            plotline_pipeline::diagnostics::process_staged_with_diagnostics(
                bytes, config, &StdClock,
            )?;
        Ok((staged.into_result(), Some(diagnostics)))
    } else {
        Ok((plotline_pipeline::process(bytes, config)?, None))
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.input).map_err(|source| CliError::Read {
        path: cli.input.clone(),
        source,
    })?;
    tracing::info!(
        input = %cli.input.display(),
        bytes = image_bytes.len(),
        "read input image"
    );

    let (result, diagnostics) = vectorize(&image_bytes, &config, cli.diagnostics.is_some())?;

    if let (Some(format), Some(diagnostics)) = (cli.diagnostics, &diagnostics) {
        match format {
            DiagnosticsFormat::Text => eprintln!("{}", diagnostics.report()),
            DiagnosticsFormat::Json => {
                let json = serde_json::to_string_pretty(diagnostics).map_err(|source| {
                    CliError::Serialize {
                        what: "diagnostics",
                        source,
                    }
                })?;
                println!("{json}");
            }
        }
    }

    let title = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("plotline");
    let description = describe(&config);
    let config_json = serde_json::to_string(&config).map_err(|source| CliError::Serialize {
        what: "pipeline config",
        source,
    })?;
    let metadata = if cli.no_metadata {
        SvgMetadata::default()
    } else {
        SvgMetadata {
            title: Some(title),
            description: Some(&description),
            config_json: Some(&config_json),
        }
    };

    let svg = plotline_export::to_svg(&result, &metadata);
    write_atomically(&cli.output, &svg)?;
    tracing::info!(
        output = %cli.output.display(),
        paths = result.paths.len(),
        bytes = svg.len(),
        "wrote svg"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("plotline").chain(args.iter().copied()))
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("plotline-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path) {
        let img = image_fixture();
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        std::fs::write(path, buf).unwrap();
    }

    /// 80x40 white image with one horizontal 3 px stroke.
    fn image_fixture() -> image::RgbaImage {
        image::RgbaImage::from_fn(80, 40, |x, y| {
            if (10..70).contains(&x) && (18..21).contains(&y) {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = parse(&["in.png", "out.svg"]).unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(cli.diagnostics.is_none());
        assert!(!cli.no_metadata);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "in.png",
            "out.svg",
            "--threshold",
            "90",
            "--min-length",
            "40",
            "--smoothness",
            "1.5",
            "--canvas-width",
            "115",
            "--canvas-height",
            "85",
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.threshold, 90);
        assert!((config.min_length - 40.0).abs() < f64::EPSILON);
        assert!((config.smoothness - 1.5).abs() < f64::EPSILON);
        assert_eq!(
            config.canvas,
            Some(CanvasSize {
                width_mm: 115.0,
                height_mm: 85.0
            })
        );
    }

    #[test]
    fn canvas_dimensions_are_required_together() {
        assert!(parse(&["in.png", "out.svg", "--canvas-width", "115"]).is_err());
        assert!(parse(&["in.png", "out.svg", "--canvas-height", "85"]).is_err());
    }

    #[test]
    fn out_of_range_threshold_parses_but_fails_validation() {
        let cli = parse(&["in.png", "out.svg", "--threshold", "-1"]).unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = parse(&[
            "in.png",
            "out.svg",
            "--threshold",
            "10",
            "--config-json",
            r#"{"smoothness": 2.0}"#,
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.threshold, PipelineConfig::DEFAULT_THRESHOLD);
        assert!((config.smoothness - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["in.png", "out.svg", "--config-json", "{nope"]).unwrap();
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.to_string().starts_with("error parsing --config-json"));
    }

    #[test]
    fn description_lists_parameters() {
        let config = PipelineConfig {
            canvas: Some(CanvasSize {
                width_mm: 115.0,
                height_mm: 85.0,
            }),
            ..PipelineConfig::default()
        };
        assert_eq!(
            describe(&config),
            "threshold=127 min-length=25 smoothness=0.2 canvas=115x85mm"
        );
    }

    #[test]
    fn run_writes_svg_and_leaves_no_temp_file() {
        let dir = scratch_dir("run");
        let input = dir.join("stroke.png");
        let output = dir.join("stroke.svg");
        write_png(&input);

        let cli = parse(&[input.to_str().unwrap(), output.to_str().unwrap()]).unwrap();
        run(&cli).unwrap();

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.contains("<title>stroke</title>"));
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(!dir.join("stroke.svg.tmp").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn no_metadata_omits_title() {
        let dir = scratch_dir("no-meta");
        let input = dir.join("stroke.png");
        let output = dir.join("stroke.svg");
        write_png(&input);

        let cli = parse(&[
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--no-metadata",
        ])
        .unwrap();
        run(&cli).unwrap();

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(!svg.contains("<title"));
        assert!(!svg.contains("<metadata"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_input_fails_without_creating_output() {
        let dir = scratch_dir("missing");
        let output = dir.join("never.svg");
        let cli = parse(&[
            dir.join("absent.png").to_str().unwrap(),
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(matches!(run(&cli), Err(CliError::Read { .. })));
        assert!(!output.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_threshold_fails_without_creating_output() {
        let dir = scratch_dir("threshold");
        let input = dir.join("stroke.png");
        let output = dir.join("stroke.svg");
        write_png(&input);

        let cli = parse(&[
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--threshold",
            "300",
        ])
        .unwrap();
        assert!(matches!(
            run(&cli),
            Err(CliError::Pipeline(PipelineError::InvalidArgument(_)))
        ));
        assert!(!output.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn existing_temp_file_is_not_overwritten() {
        let dir = scratch_dir("stale-tmp");
        let output = dir.join("out.svg");
        let tmp = dir.join("out.svg.tmp");
        std::fs::write(&tmp, "someone else's file").unwrap();

        let err = write_atomically(&output, "<svg/>").unwrap_err();
        assert!(matches!(err, CliError::Write { .. }));
        assert_eq!(std::fs::read_to_string(&tmp).unwrap(), "someone else's file");
        assert!(!output.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = scratch_dir("bad-rename");
        // A non-empty directory cannot be replaced by a file.
        let output = dir.join("taken");
        std::fs::create_dir_all(output.join("child")).unwrap();

        let err = write_atomically(&output, "<svg/>").unwrap_err();
        assert!(matches!(err, CliError::Write { .. }));
        assert!(!dir.join("taken.tmp").exists());
        assert!(output.is_dir());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
