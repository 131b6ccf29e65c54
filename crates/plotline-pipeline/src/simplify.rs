//! Contour filtering and simplification.
//!
//! For each traced contour: reject it if its arc length is below the
//! configured floor, reduce it with Ramer-Douglas-Peucker, then drop
//! near-duplicate consecutive vertices so no zero-length curve segments
//! reach the fitter.

use crate::stage::Stage;
use crate::types::{Contour, PipelineError, Point, Polyline};

/// Consecutive vertices closer than this (pixels) are merged, keeping
/// the first.
pub const DUPLICATE_TOLERANCE: f64 = 0.5;

/// Stage 4: contours to simplified polylines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSimplifier {
    /// Contours shorter than this arc length are discarded.
    pub min_length: f64,
    /// RDP tolerance: the maximum perpendicular deviation a dropped
    /// vertex may have from the simplified line.
    pub smoothness: f64,
}

impl PathSimplifier {
    /// Filter and simplify one contour.
    ///
    /// Returns `None` when the contour is shorter than `min_length` or
    /// fewer than two vertices survive.
    #[must_use]
    pub fn simplify_contour(&self, contour: &Contour) -> Option<Polyline> {
        self.simplify_polyline(&contour.to_polyline())
    }

    /// Filter and simplify an already-floating-point polyline.
    ///
    /// Applies the `min_length` floor before reducing. Simplification
    /// shortens a path, so one that only just cleared the floor can fail
    /// it on a second pass; use [`reduce`](Self::reduce) to re-simplify
    /// output.
    #[must_use]
    pub fn simplify_polyline(&self, polyline: &Polyline) -> Option<Polyline> {
        if polyline.arc_length() < self.min_length {
            return None;
        }
        self.reduce(polyline)
    }

    /// RDP followed by near-duplicate removal, with no length floor.
    ///
    /// Idempotent: reducing a reduced polyline returns it unchanged.
    /// Returns `None` when fewer than two vertices survive.
    #[must_use]
    pub fn reduce(&self, polyline: &Polyline) -> Option<Polyline> {
        let reduced = dedup_close_points(&simplify(polyline, self.smoothness), DUPLICATE_TOLERANCE);
        (reduced.len() >= 2).then_some(reduced)
    }
}

impl Stage<&[Contour]> for PathSimplifier {
    type Output = Vec<Polyline>;

    fn name(&self) -> &'static str {
        "simplify"
    }

    fn run(&self, contours: &[Contour]) -> Result<Vec<Polyline>, PipelineError> {
        let kept: Vec<Polyline> = contours
            .iter()
            .filter_map(|c| self.simplify_contour(c))
            .collect();
        tracing::debug!(
            contours = contours.len(),
            kept = kept.len(),
            rejected = contours.len() - kept.len(),
            min_length = self.min_length,
            smoothness = self.smoothness,
            "simplified contours"
        );
        Ok(kept)
    }
}

/// Simplify a single polyline using the Ramer-Douglas-Peucker algorithm.
///
/// Points within `tolerance` pixels of the line between their endpoints
/// are removed. A tolerance of 0.0 preserves all points not exactly on
/// the line. Endpoints are always kept.
///
/// Returns the simplified polyline. Polylines with fewer than 3 points
/// are returned unchanged (nothing to simplify).
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    let points = polyline.points();
    if points.len() < 3 {
        return polyline.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    let simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polyline::new(simplified)
}

/// Drop every point closer than `tolerance` to the last kept point.
///
/// The first point is always kept, so the path still starts where the
/// contour started.
#[must_use = "returns the deduplicated polyline"]
pub fn dedup_close_points(polyline: &Polyline, tolerance: f64) -> Polyline {
    let mut out: Vec<Point> = Vec::with_capacity(polyline.len());
    for &p in polyline.points() {
        match out.last() {
            Some(&last) if last.distance(p) < tolerance => {}
            _ => out.push(p),
        }
    }
    Polyline::new(out)
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide (a closed loop), returns the distance from
/// `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::GridPoint;

    fn simplifier(min_length: f64, smoothness: f64) -> PathSimplifier {
        PathSimplifier {
            min_length,
            smoothness,
        }
    }

    fn contour(points: &[(u32, u32)]) -> Contour {
        Contour::new(points.iter().map(|&(x, y)| GridPoint::new(x, y)).collect())
    }

    // --- RDP ---

    #[test]
    fn two_points_unchanged() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        assert_eq!(simplify(&pl, 1.0).len(), 2);
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
            Point::new(4.0, 4.0),
        ]);
        let result = simplify(&pl, 0.1);
        assert_eq!(
            result.points(),
            &[Point::new(0.0, 0.0), Point::new(4.0, 4.0)]
        );
    }

    #[test]
    fn zigzag_retains_peaks() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 5.0),
            Point::new(4.0, 0.0),
            Point::new(6.0, 5.0),
            Point::new(8.0, 0.0),
        ]);
        assert_eq!(simplify(&pl, 1.0).len(), 5);
        assert_eq!(simplify(&pl, 10.0).len(), 2);
    }

    #[test]
    fn closed_loop_keeps_its_far_corners() {
        // Square walked from (0,0) back to (0,0).
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(simplify(&pl, 1.0), pl);
    }

    #[test]
    fn perpendicular_distance_diagonal_segment() {
        let d = perpendicular_distance(
            Point::new(2.0, -1.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
        );
        let expected = 8.0 / 20.0_f64.sqrt();
        assert!((d - expected).abs() < 1e-10, "got {d}, expected {expected}");
    }

    #[test]
    fn perpendicular_distance_coincident_endpoints() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-10);
    }

    // --- Deduplication ---

    #[test]
    fn dedup_drops_near_duplicates_keeping_first() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.2, 0.1),
            Point::new(5.0, 0.0),
            Point::new(5.3, 0.0),
            Point::new(9.0, 0.0),
        ]);
        let result = dedup_close_points(&pl, DUPLICATE_TOLERANCE);
        assert_eq!(
            result.points(),
            &[
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(9.0, 0.0)
            ]
        );
    }

    #[test]
    fn dedup_keeps_points_exactly_at_tolerance() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(0.5, 0.0)]);
        assert_eq!(dedup_close_points(&pl, DUPLICATE_TOLERANCE).len(), 2);
    }

    // --- PathSimplifier ---

    #[test]
    fn short_contour_is_rejected() {
        let dot = contour(&[(5, 5), (6, 5)]);
        assert!(simplifier(25.0, 1.0).simplify_contour(&dot).is_none());
    }

    #[test]
    fn single_point_contour_is_rejected() {
        let dot = contour(&[(5, 5)]);
        assert!(simplifier(0.1, 1.0).simplify_contour(&dot).is_none());
    }

    #[test]
    fn long_contour_survives_with_original_endpoints() {
        let stroke = contour(&[(0, 0), (10, 1), (20, 0), (30, 0), (40, 0)]);
        let result = simplifier(25.0, 2.0).simplify_contour(&stroke).unwrap();
        assert_eq!(result.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(result.last(), Some(&Point::new(40.0, 0.0)));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn run_filters_short_and_keeps_long() {
        let contours = vec![
            contour(&[(1, 1), (3, 1)]),
            contour(&[(0, 10), (50, 10)]),
            contour(&[(40, 40)]),
        ];
        let kept = simplifier(25.0, 1.0).run(contours.as_slice()).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].first(), Some(&Point::new(0.0, 10.0)));
    }

    #[test]
    fn simplification_is_idempotent() {
        let stroke = contour(&[
            (0, 0),
            (5, 1),
            (10, 4),
            (15, 9),
            (20, 9),
            (25, 8),
            (30, 3),
            (35, 0),
            (40, 0),
            (40, 10),
            (40, 20),
        ]);
        let s = simplifier(5.0, 1.0);
        let once = s.simplify_contour(&stroke).unwrap();
        let twice = s.reduce(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn reduce_is_idempotent_for_paths_near_the_floor() {
        // Arc length 24.54 clears the floor; the reduced chord is 24.02.
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(12.0, 3.0),
            Point::new(24.0, 1.0),
        ]);
        let s = simplifier(24.5, 3.0);
        let once = s.simplify_polyline(&pl).unwrap();
        assert_eq!(once.len(), 2);
        assert!(once.arc_length() < s.min_length);

        assert_eq!(s.reduce(&once), Some(once.clone()));
        assert!(s.simplify_polyline(&once).is_none());
    }

    #[test]
    fn no_consecutive_points_closer_than_tolerance() {
        let stroke = contour(&[
            (0, 0),
            (1, 0),
            (1, 1),
            (2, 1),
            (2, 2),
            (3, 2),
            (30, 2),
            (30, 30),
        ]);
        let result = simplifier(1.0, 0.0).simplify_contour(&stroke).unwrap();
        for w in result.points().windows(2) {
            assert!(w[0].distance(w[1]) >= DUPLICATE_TOLERANCE);
        }
    }
}
