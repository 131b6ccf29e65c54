//! plotline-pipeline: Raster-to-centerline vectorization (sans-IO).
//!
//! Converts a line drawing into smooth open curves through:
//! decode -> binarize -> skeletonize -> trace contours ->
//! simplify -> estimate tangents -> fit Bezier curves -> map to canvas.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Serialization to SVG lives
//! in `plotline-export`; file handling lives in the `plotline` binary.

pub mod binarize;
pub mod canvas;
pub mod contour;
pub mod curve;
pub mod diagnostics;
pub mod grayscale;
pub mod mask;
pub mod simplify;
pub mod skeleton;
pub mod stage;
pub mod types;

pub use binarize::Binarizer;
pub use canvas::{CanvasMapper, CanvasMode, CanvasTransform, MARGIN_MM};
pub use contour::ContourTracerKind;
pub use curve::{BezierFitter, CURVE_TIGHTNESS, TangentEstimator};
pub use grayscale::Decoder;
pub use mask::{BinaryMask, Skeleton};
pub use simplify::{DUPLICATE_TOLERANCE, PathSimplifier};
pub use skeleton::Skeletonizer;
pub use stage::Stage;
pub use types::{
    BezierPath, BezierSegment, CanvasSize, Contour, Dimensions, GridPoint, PipelineConfig,
    PipelineError, Point, Polyline, ProcessResult, StagedResult, Vector,
};

/// Run the full vectorization pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then produces a [`ProcessResult`] holding one Bezier path per
/// surviving stroke, the source image dimensions and the canvas
/// mapping the SVG emitter needs.
///
/// An image with no foreground, or whose strokes are all shorter than
/// `config.min_length`, yields zero paths; that is not an error.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidArgument`] if the configuration is
/// out of range (checked before the image is decoded).
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::ImageRead`]
/// if the bytes cannot be decoded.
pub fn process(image_bytes: &[u8], config: &PipelineConfig) -> Result<ProcessResult, PipelineError> {
    process_staged(image_bytes, config).map(StagedResult::into_result)
}

/// Run the pipeline and keep every intermediate result.
///
/// # Pipeline steps
///
/// 1. Decode image and convert to grayscale
/// 2. Fixed-threshold binarization
/// 3. Topology-preserving thinning
/// 4. Border-following contour tracing
/// 5. Arc length filter and RDP simplification
/// 6. Tangent estimation and cubic Bezier fitting
/// 7. Canvas mapping
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    diagnostics::process_staged_with_diagnostics(image_bytes, config, &diagnostics::NoClock)
        .map(|(staged, _)| staged)
}
