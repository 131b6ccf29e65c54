//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning. [`process_staged_with_diagnostics`] is the one place
//! the stage sequence is written down;
//! [`process_staged`](crate::process_staged) runs it with [`NoClock`] and
//! discards the report.
//!
//! The library never reads the system clock itself. Callers supply a
//! [`Clock`], so the crate stays free of platform time APIs.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::binarize::Binarizer;
use crate::canvas::CanvasMapper;
use crate::contour::ContourTracerKind;
use crate::curve::{BezierFitter, fit_paths};
use crate::grayscale::Decoder;
use crate::simplify::PathSimplifier;
use crate::skeleton::Skeletonizer;
use crate::stage::Stage;
use crate::types::{Contour, Dimensions, PipelineConfig, PipelineError, Polyline, StagedResult};

/// Time source for stage measurements.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A [`Clock`] that never advances. Every duration it reports is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding and grayscale conversion.
    pub decode: StageDiagnostics,
    /// Stage 1: thresholding.
    pub binarize: StageDiagnostics,
    /// Stage 2: thinning.
    pub skeletonize: StageDiagnostics,
    /// Stage 3: contour tracing.
    pub contour_tracing: StageDiagnostics,
    /// Stage 4: length filtering and RDP simplification.
    pub simplification: StageDiagnostics,
    /// Stages 5 and 6: tangent estimation and Bezier fitting.
    pub curve_fitting: StageDiagnostics,
    /// Stage 7: canvas mapping.
    pub canvas: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// The stage's [`Stage::name`].
    pub stage: String,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Thresholding metrics.
    Binarize {
        /// Cutoff intensity.
        threshold: u8,
        /// Pixels marked as foreground.
        foreground_pixels: u64,
    },
    /// Thinning metrics.
    Skeletonize {
        /// Foreground pixels before thinning.
        pixels_before: u64,
        /// Skeleton pixels after thinning.
        pixels_after: u64,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// Number of contours found.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Minimum points in any single contour.
        min_contour_points: usize,
        /// Maximum points in any single contour.
        max_contour_points: usize,
        /// Mean points per contour.
        mean_contour_points: f64,
    },
    /// Path simplification metrics.
    Simplification {
        /// Arc length floor in pixels.
        min_length: f64,
        /// RDP tolerance in pixels.
        tolerance: f64,
        /// Contours dropped by the length floor (or collapsing below two
        /// vertices).
        rejected: usize,
        /// Number of polylines kept.
        polyline_count: usize,
        /// Total points before simplification.
        points_before: usize,
        /// Total points after simplification.
        points_after: usize,
    },
    /// Curve fitting metrics.
    CurveFitting {
        /// Number of Bezier paths.
        path_count: usize,
        /// Total cubic segments across all paths.
        segment_count: usize,
    },
    /// Canvas mapping metrics.
    Canvas {
        /// `true` when a millimetre canvas was requested.
        physical: bool,
        /// Document units per pixel.
        scale: f64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of contours traced.
    pub contour_count: usize,
    /// Number of paths in the output document.
    pub path_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        for diag in self.stages() {
            let name = &diag.stage;
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Output paths: {}",
            self.summary.contour_count, self.summary.path_count,
        ));

        lines.join("\n")
    }

    /// Every stage in execution order.
    #[must_use]
    pub const fn stages(&self) -> [&StageDiagnostics; 7] {
        [
            &self.decode,
            &self.binarize,
            &self.skeletonize,
            &self.contour_tracing,
            &self.simplification,
            &self.curve_fitting,
            &self.canvas,
        ]
    }
}

/// Run the pipeline, timing each stage with `clock`.
///
/// Validates `config` before decoding, then runs every stage in order
/// and logs a one-line summary.
///
/// # Errors
///
/// Same as [`process_staged`](crate::process_staged).
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let pipeline_start = clock.now();

    let start = clock.now();
    let grayscale = Decoder.run(image_bytes)?;
    let dimensions = Dimensions {
        width: grayscale.width(),
        height: grayscale.height(),
    };
    let pixel_count = u64::from(dimensions.width) * u64::from(dimensions.height);
    let decode = StageDiagnostics {
        stage: Decoder.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count,
        },
    };

    let start = clock.now();
    let binarizer = Binarizer::new(config.threshold)?;
    let mask = binarizer.run(&grayscale)?;
    let binarize = StageDiagnostics {
        stage: binarizer.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Binarize {
            threshold: binarizer.threshold(),
            foreground_pixels: mask.count_foreground(),
        },
    };

    let start = clock.now();
    let skeleton = Skeletonizer.run(&mask)?;
    let skeletonize = StageDiagnostics {
        stage: Skeletonizer.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Skeletonize {
            pixels_before: mask.count_foreground(),
            pixels_after: skeleton.mask().count_foreground(),
        },
    };

    let start = clock.now();
    let tracer = ContourTracerKind::default();
    let contours = tracer.run(&skeleton)?;
    let stats = contour_stats(&contours);
    let contour_tracing = StageDiagnostics {
        stage: tracer.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::ContourTracing {
            contour_count: contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        },
    };

    let start = clock.now();
    let simplifier = PathSimplifier {
        min_length: config.min_length,
        smoothness: config.smoothness,
    };
    let simplified = simplifier.run(contours.as_slice())?;
    let simplification = StageDiagnostics {
        stage: simplifier.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Simplification {
            min_length: config.min_length,
            tolerance: config.smoothness,
            rejected: contours.len() - simplified.len(),
            polyline_count: simplified.len(),
            points_before: stats.total,
            points_after: total_points(&simplified),
        },
    };

    let start = clock.now();
    let paths = fit_paths(&simplified)?;
    let curve_fitting = StageDiagnostics {
        stage: BezierFitter.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::CurveFitting {
            path_count: paths.len(),
            segment_count: paths.iter().map(|p| p.segments.len()).sum(),
        },
    };

    let start = clock.now();
    let mapper = CanvasMapper {
        canvas: config.canvas,
    };
    let transform = mapper.run(dimensions)?;
    let canvas = StageDiagnostics {
        stage: mapper.name().to_string(),
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Canvas {
            physical: transform.is_physical(),
            scale: transform.scale,
        },
    };

    tracing::info!(
        width = dimensions.width,
        height = dimensions.height,
        contours = contours.len(),
        paths = paths.len(),
        "vectorized image"
    );

    let diagnostics = PipelineDiagnostics {
        decode,
        binarize,
        skeletonize,
        contour_tracing,
        simplification,
        curve_fitting,
        canvas,
        total_duration: clock.elapsed(&pipeline_start),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count,
            contour_count: contours.len(),
            path_count: paths.len(),
        },
    };

    let staged = StagedResult {
        grayscale,
        mask,
        skeleton,
        contours,
        simplified,
        paths,
        transform,
        dimensions,
    };
    Ok((staged, diagnostics))
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => {
            format!("{input_bytes} bytes -> {width}x{height}")
        }
        StageMetrics::Binarize {
            threshold,
            foreground_pixels,
        } => format!("threshold={threshold} foreground={foreground_pixels}"),
        StageMetrics::Skeletonize {
            pixels_before,
            pixels_after,
        } => format!("{pixels_before}->{pixels_after} px"),
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => {
            format!(
                "{contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
            )
        }
        StageMetrics::Simplification {
            min_length,
            tolerance,
            rejected,
            polyline_count,
            points_before,
            points_after,
        } => {
            format!(
                "min_len={min_length:.1} tol={tolerance:.2} kept={polyline_count} rejected={rejected} {points_before}->{points_after} pts",
            )
        }
        StageMetrics::CurveFitting {
            path_count,
            segment_count,
        } => format!("{path_count} paths, {segment_count} segments"),
        StageMetrics::Canvas { physical, scale } => {
            let unit = if *physical { "mm/px" } else { "px/px" };
            format!("scale={scale:.6} {unit}")
        }
    }
}

/// Statistics for a set of traced contours.
struct ContourStats {
    /// Total number of points across all contours.
    total: usize,
    /// Minimum number of points in any single contour.
    min: usize,
    /// Maximum number of points in any single contour.
    max: usize,
    /// Mean number of points per contour.
    mean: f64,
}

fn contour_stats(contours: &[Contour]) -> ContourStats {
    let total: usize = contours.iter().map(Contour::len).sum();
    let min = contours.iter().map(Contour::len).min().unwrap_or(0);
    let max = contours.iter().map(Contour::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}

/// Total points across a slice of polylines.
fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}
