//! Contour tracing: turn each skeleton component into an open point chain.
//!
//! The [`ContourTracerKind`] enum selects the tracing algorithm at
//! runtime; every variant implements [`Stage`] so the pipeline does not
//! care which one is in use.
//!
//! Border following walks the outer border of each 8-connected
//! component. On a 1-pixel-wide skeleton that border visits every
//! pixel, going out along each branch and coming back along it, so the
//! chain covers the whole stroke. Straight runs are then compressed to
//! the pixels where the walk changes direction.

use imageproc::contours::{BorderType, find_contours};
use serde::{Deserialize, Serialize};

use crate::mask::Skeleton;
use crate::stage::Stage;
use crate::types::{Contour, GridPoint, PipelineError};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`,
    /// keeping outer borders only, with chain compression.
    #[default]
    BorderFollowing,
}

impl Stage<&Skeleton> for ContourTracerKind {
    type Output = Vec<Contour>;

    fn name(&self) -> &'static str {
        match *self {
            Self::BorderFollowing => "trace-contours",
        }
    }

    fn run(&self, skeleton: &Skeleton) -> Result<Vec<Contour>, PipelineError> {
        let contours = match *self {
            Self::BorderFollowing => trace_border_following(skeleton),
        };
        tracing::debug!(contours = contours.len(), "traced skeleton contours");
        Ok(contours)
    }
}

/// Trace the outer border of every skeleton component.
///
/// Components are returned in raster order of their first pixel.
#[must_use = "returns the traced contours"]
pub fn trace_border_following(skeleton: &Skeleton) -> Vec<Contour> {
    let image = skeleton.mask().to_gray_image();
    let contours: Vec<imageproc::contours::Contour<u32>> = find_contours(&image);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && !c.points.is_empty())
        .map(|c| {
            let raw: Vec<GridPoint> = c
                .points
                .into_iter()
                .map(|p| GridPoint::new(p.x, p.y))
                .collect();
            Contour::new(compress_chain(&raw))
        })
        .collect()
}

/// Keep only the points where a closed border walk changes direction,
/// then open the cycle at its start.
///
/// The start is always kept. If the walk arrives back at the start from
/// a different pixel than it left by, the component contains a loop and
/// the start is appended so the chain closes; otherwise the walk's final
/// run merely retraces its first one and is dropped.
fn compress_chain(raw: &[GridPoint]) -> Vec<GridPoint> {
    let raw = match raw {
        [first, rest @ .., last] if first == last && !rest.is_empty() => &raw[..raw.len() - 1],
        _ => raw,
    };
    let n = raw.len();
    if n < 3 {
        return raw.to_vec();
    }

    let step = |a: GridPoint, b: GridPoint| {
        (
            i64::from(b.x) - i64::from(a.x),
            i64::from(b.y) - i64::from(a.y),
        )
    };

    let mut chain: Vec<GridPoint> = Vec::new();
    chain.push(raw[0]);
    for i in 1..n {
        let prev = raw[i - 1];
        let next = raw[(i + 1) % n];
        if step(prev, raw[i]) != step(raw[i], next) {
            chain.push(raw[i]);
        }
    }

    if raw[1] != raw[n - 1] {
        chain.push(raw[0]);
    }
    chain
}
