//! Homotopic thinning: reduce foreground strokes to 1-pixel-wide
//! centerlines without changing the mask's topology.
//!
//! Foreground is 4-connected and background 8-connected. A pixel may be
//! deleted only when it is *simple*: within its 8-neighbourhood the
//! foreground forms exactly one 4-connected group touching the pixel and
//! the background forms exactly one 8-connected group. Deleting simple
//! pixels one at a time never splits or merges a component and never
//! opens or fills a hole.
//!
//! Each iteration peels one layer from each side (north, south, east,
//! west). A sub-pass snapshots the pixels whose neighbour on that side
//! is background, then visits them in raster order, re-testing each
//! against the current mask before deleting it. Endpoints (exactly one
//! foreground 4-neighbour) are kept so open strokes do not shrink away.

use crate::mask::{BinaryMask, Skeleton};
use crate::stage::Stage;
use crate::types::PipelineError;

/// The 8-neighbourhood in counter-clockwise order starting east
/// (image y grows downward). Even indices are the 4-neighbours.
const RING: [(i64, i64); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Sub-pass order: north, south, east, west.
const SIDES: [(i64, i64); 4] = [(0, -1), (0, 1), (1, 0), (-1, 0)];

/// Stage 2: binary mask to skeleton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skeletonizer;

impl Stage<&BinaryMask> for Skeletonizer {
    type Output = Skeleton;

    fn name(&self) -> &'static str {
        "skeletonize"
    }

    fn run(&self, mask: &BinaryMask) -> Result<Skeleton, PipelineError> {
        Ok(thin(mask))
    }
}

/// Thin `mask` until no pixel can be removed.
#[must_use = "returns the thinned skeleton"]
pub fn thin(mask: &BinaryMask) -> Skeleton {
    let mut current = mask.clone();
    let width = i64::from(mask.width());
    let height = i64::from(mask.height());
    let mut iterations = 0_u32;

    loop {
        iterations += 1;
        let mut removed = 0_u64;

        for (sx, sy) in SIDES {
            let mut candidates = Vec::new();
            for y in 0..height {
                for x in 0..width {
                    if current.get(x, y) && !current.get(x + sx, y + sy) {
                        candidates.push((x, y));
                    }
                }
            }
            for (x, y) in candidates {
                if is_deletable(&current, x, y) {
                    current.set(x, y, false);
                    removed += 1;
                }
            }
        }

        if removed == 0 {
            break;
        }
    }

    tracing::debug!(
        iterations,
        before = mask.count_foreground(),
        after = current.count_foreground(),
        "thinned mask"
    );
    Skeleton::new(current)
}

/// A foreground pixel is deletable when it is simple and not an endpoint.
fn is_deletable(mask: &BinaryMask, x: i64, y: i64) -> bool {
    let foreground = RING.map(|(dx, dy)| mask.get(x + dx, y + dy));
    let four_neighbours = foreground.iter().step_by(2).filter(|&&f| f).count();
    if four_neighbours <= 1 {
        return false;
    }
    let background = foreground.map(|f| !f);
    count_groups(foreground, true) == 1 && count_groups(background, false) == 1
}

/// Count connected groups among the `members` of the 8-neighbourhood.
///
/// With `four_connected`, groups are formed by 4-adjacency and only
/// groups containing a 4-neighbour of the centre are counted; otherwise
/// groups use 8-adjacency and all count.
fn count_groups(members: [bool; 8], four_connected: bool) -> usize {
    let mut seen = [false; 8];
    let mut groups = 0;

    for start in 0..8 {
        if !members[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        let mut stack = [0_usize; 8];
        let mut len = 1;
        stack[0] = start;
        let mut touches_centre = false;

        while len > 0 {
            len -= 1;
            let i = stack[len];
            touches_centre |= i % 2 == 0;
            for j in 0..8 {
                if members[j] && !seen[j] && adjacent(i, j, four_connected) {
                    seen[j] = true;
                    stack[len] = j;
                    len += 1;
                }
            }
        }

        if touches_centre || !four_connected {
            groups += 1;
        }
    }
    groups
}

fn adjacent(i: usize, j: usize, four_connected: bool) -> bool {
    let dx = (RING[i].0 - RING[j].0).abs();
    let dy = (RING[i].1 - RING[j].1).abs();
    if four_connected {
        dx + dy == 1
    } else {
        dx.max(dy) == 1
    }
}
