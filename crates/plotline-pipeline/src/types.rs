//! Shared types for the plotline vectorization pipeline.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::canvas::MARGIN_MM;

/// Re-export `GrayImage` so downstream crates can reference the
/// decoded raster without depending on `image` directly.
pub use image::GrayImage;

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
    ///
    /// Avoids the square root for comparison purposes.
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

/// A 2D displacement, e.g. the tangent at a path vertex.
///
/// Not normalized: magnitude carries meaning for curve fitting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    /// Horizontal component.
    pub dx: f64,
    /// Vertical component.
    pub dy: f64,
}

impl Vector {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new vector.
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Self) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Vector> for Point {
    type Output = Self;

    fn add(self, rhs: Vector) -> Self {
        Self::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

impl Sub<Vector> for Point {
    type Output = Self;

    fn sub(self, rhs: Vector) -> Self {
        Self::new(self.x - rhs.dx, self.y - rhs.dy)
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.dx * rhs, self.dy * rhs)
    }
}

impl Div<f64> for Vector {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.dx / rhs, self.dy / rhs)
    }
}

/// A sequence of connected points forming a path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Total length along the polyline (sum of consecutive distances).
    #[must_use]
    pub fn arc_length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// An integer pixel coordinate on a traced contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl GridPoint {
    /// Create a new grid point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Convert to a floating-point [`Point`].
    #[must_use]
    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

/// An open chain of pixel coordinates traced from one skeleton component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<GridPoint>);

impl Contour {
    /// Create a contour from its chain of points.
    #[must_use]
    pub const fn new(points: Vec<GridPoint>) -> Self {
        Self(points)
    }

    /// Returns the chain of points.
    #[must_use]
    pub fn points(&self) -> &[GridPoint] {
        &self.0
    }

    /// Number of points in the chain.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the chain has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The chain as a floating-point polyline.
    #[must_use]
    pub fn to_polyline(&self) -> Polyline {
        Polyline::new(self.0.iter().map(|p| p.to_point()).collect())
    }

    /// Open arc length of the chain.
    #[must_use]
    pub fn arc_length(&self) -> f64 {
        self.0
            .windows(2)
            .map(|w| w[0].to_point().distance(w[1].to_point()))
            .sum()
    }
}

/// One cubic Bezier segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierSegment {
    /// Segment start (on-curve).
    pub start: Point,
    /// First control point, shaping the departure from `start`.
    pub control1: Point,
    /// Second control point, shaping the arrival at `end`.
    pub control2: Point,
    /// Segment end (on-curve).
    pub end: Point,
}

/// A move-to followed by a chain of cubic Bezier segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BezierPath {
    /// Move-to position.
    pub start: Point,
    /// Curve segments; each starts where the previous one ends.
    pub segments: Vec<BezierSegment>,
}

impl BezierPath {
    /// On-curve vertices: the start followed by every segment end.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.start).chain(self.segments.iter().map(|s| s.end))
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

/// Physical drawing area in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Canvas width in millimetres.
    pub width_mm: f64,
    /// Canvas height in millimetres.
    pub height_mm: f64,
}

impl CanvasSize {
    /// Check that both axes are finite and leave room inside the margins.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] for non-positive,
    /// non-finite, or margin-swallowed dimensions.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (axis, value) in [("width", self.width_mm), ("height", self.height_mm)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidArgument(format!(
                    "canvas {axis} must be a positive number of millimetres, got {value}"
                )));
            }
            if value <= 2.0 * MARGIN_MM {
                return Err(PipelineError::InvalidArgument(format!(
                    "canvas {axis} {value}mm leaves no drawable area inside the {MARGIN_MM}mm margins"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the vectorization pipeline.
///
/// Missing fields fall back to their defaults when deserialized, so a
/// partial JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Binarization cutoff: pixels with intensity at or below this value
    /// are foreground. Must lie in `0..=255`.
    pub threshold: i32,

    /// Contours whose arc length (pixels) is below this floor are dropped.
    pub min_length: f64,

    /// Ramer-Douglas-Peucker tolerance in pixels. Higher values give
    /// fewer vertices and smoother curves.
    pub smoothness: f64,

    /// Physical canvas for millimetre output, or `None` for pixel output.
    pub canvas: Option<CanvasSize>,
}

impl PipelineConfig {
    /// Default binarization cutoff.
    pub const DEFAULT_THRESHOLD: i32 = 127;
    /// Default contour rejection floor in pixels.
    pub const DEFAULT_MIN_LENGTH: f64 = 25.0;
    /// Default simplification tolerance in pixels.
    pub const DEFAULT_SMOOTHNESS: f64 = 0.2;

    /// Check every parameter against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] naming the first
    /// offending parameter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.threshold_u8()?;
        if !self.min_length.is_finite() || self.min_length <= 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "min-length must be positive, got {}",
                self.min_length
            )));
        }
        if !self.smoothness.is_finite() || self.smoothness < 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "smoothness must be zero or positive, got {}",
                self.smoothness
            )));
        }
        if let Some(canvas) = &self.canvas {
            canvas.validate()?;
        }
        Ok(())
    }

    /// The threshold as a pixel intensity.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the threshold is
    /// outside `0..=255`.
    pub fn threshold_u8(&self) -> Result<u8, PipelineError> {
        u8::try_from(self.threshold).map_err(|_| {
            PipelineError::InvalidArgument(format!(
                "threshold must be in 0..=255, got {}",
                self.threshold
            ))
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            min_length: Self::DEFAULT_MIN_LENGTH,
            smoothness: Self::DEFAULT_SMOOTHNESS,
            canvas: None,
        }
    }
}

/// Result of running the full pipeline.
///
/// Carries everything the SVG emitter needs: the fitted curves, the
/// source image size (for the `viewBox`), and the canvas mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// One Bezier path per surviving contour.
    pub paths: Vec<BezierPath>,

    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,

    /// Mapping from image pixels onto the output document.
    pub transform: crate::canvas::CanvasTransform,
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Useful for inspecting why a drawing vectorized the way it did.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Decoded grayscale image.
    pub grayscale: GrayImage,
    /// Stage 1: binary foreground mask.
    pub mask: crate::mask::BinaryMask,
    /// Stage 2: thinned skeleton.
    pub skeleton: crate::mask::Skeleton,
    /// Stage 3: traced contour chains.
    pub contours: Vec<Contour>,
    /// Stage 4: simplified paths that survived length filtering.
    pub simplified: Vec<Polyline>,
    /// Stages 5+6: fitted Bezier paths.
    pub paths: Vec<BezierPath>,
    /// Stage 7: canvas mapping.
    pub transform: crate::canvas::CanvasTransform,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// Drop the intermediates, keeping what the emitter needs.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            paths: self.paths,
            dimensions: self.dimensions,
            transform: self.transform,
        }
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to read image: {0}")]
    ImageRead(#[from] image::ImageError),

    /// The input image bytes were empty, or decoded to a zero-sized image.
    #[error("failed to read image: input image is empty")]
    EmptyInput,

    /// A parameter is outside its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A later stage failed unexpectedly.
    #[error("processing failed: {0}")]
    Processing(String),
}
