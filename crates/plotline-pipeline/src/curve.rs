//! Tangent estimation and cubic Bezier fitting.
//!
//! Each simplified polyline becomes one [`BezierPath`] that passes
//! through every vertex. Tangents are raw (unnormalized) finite
//! differences, and each segment's control points are pushed along the
//! endpoint tangents by a fixed fraction of the segment length, so
//! longer segments and sharper turns bend more.

use crate::stage::Stage;
use crate::types::{BezierPath, BezierSegment, PipelineError, Polyline, Vector};

/// Control-point reach as a fraction of segment length.
pub const CURVE_TIGHTNESS: f64 = 0.25;

/// Stage 5: per-vertex tangents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TangentEstimator;

impl Stage<&Polyline> for TangentEstimator {
    type Output = Vec<Vector>;

    fn name(&self) -> &'static str {
        "tangents"
    }

    fn run(&self, polyline: &Polyline) -> Result<Vec<Vector>, PipelineError> {
        Ok(estimate_tangents(polyline))
    }
}

/// Tangent at every vertex of `polyline`.
///
/// The first and last vertices use the one-sided difference; interior
/// vertices average the incoming and outgoing displacements. A single
/// vertex gets the zero vector.
#[must_use = "returns the tangent field"]
pub fn estimate_tangents(polyline: &Polyline) -> Vec<Vector> {
    let p = polyline.points();
    let n = p.len();
    (0..n)
        .map(|i| match i {
            _ if n < 2 => Vector::ZERO,
            0 => p[1] - p[0],
            _ if i == n - 1 => p[n - 1] - p[n - 2],
            _ => ((p[i] - p[i - 1]) + (p[i + 1] - p[i])) / 2.0,
        })
        .collect()
}

/// Stage 6: polyline plus tangents to a cubic Bezier path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BezierFitter;

impl Stage<(&Polyline, &[Vector])> for BezierFitter {
    type Output = BezierPath;

    fn name(&self) -> &'static str {
        "fit-curves"
    }

    fn run(&self, (polyline, tangents): (&Polyline, &[Vector])) -> Result<BezierPath, PipelineError> {
        fit_bezier(polyline, tangents)
    }
}

/// Fit one cubic segment between each pair of consecutive vertices.
///
/// Pairs of coincident vertices are skipped.
///
/// # Errors
///
/// Returns [`PipelineError::Processing`] if the polyline is empty or
/// the tangent count does not match the vertex count.
pub fn fit_bezier(polyline: &Polyline, tangents: &[Vector]) -> Result<BezierPath, PipelineError> {
    let points = polyline.points();
    let Some(&start) = points.first() else {
        return Err(PipelineError::Processing(
            "cannot fit curves to an empty path".to_string(),
        ));
    };
    if tangents.len() != points.len() {
        return Err(PipelineError::Processing(format!(
            "{} tangents for {} vertices",
            tangents.len(),
            points.len()
        )));
    }

    let segments = points
        .windows(2)
        .zip(tangents.windows(2))
        .filter_map(|(p, t)| {
            let distance = p[0].distance(p[1]);
            if distance == 0.0 {
                return None;
            }
            let k = distance * CURVE_TIGHTNESS;
            Some(BezierSegment {
                start: p[0],
                control1: p[0] + t[0] * k,
                control2: p[1] - t[1] * k,
                end: p[1],
            })
        })
        .collect();

    Ok(BezierPath { start, segments })
}

/// Estimate tangents and fit curves for every polyline.
///
/// # Errors
///
/// Propagates [`fit_bezier`] failures (empty polylines).
pub fn fit_paths(polylines: &[Polyline]) -> Result<Vec<BezierPath>, PipelineError> {
    let paths = polylines
        .iter()
        .map(|pl| {
            let tangents = TangentEstimator.run(pl)?;
            BezierFitter.run((pl, tangents.as_slice()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(
        paths = paths.len(),
        segments = paths.iter().map(|p| p.segments.len()).sum::<usize>(),
        "fitted bezier paths"
    );
    Ok(paths)
}
