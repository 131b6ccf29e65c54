//! Fixed-shape binary pixel buffers.
//!
//! [`BinaryMask`] is the output of binarization; [`Skeleton`] wraps a
//! mask that has been thinned, so the tracer can only be handed thinned
//! input.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// A `width x height` grid of foreground/background pixels.
///
/// Construction validates that both dimensions are positive and that
/// the pixel buffer has exactly `width * height` entries. Deserializing
/// goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct BinaryMask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl BinaryMask {
    /// Create a mask from a row-major pixel buffer (`true` = foreground).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if a dimension is zero
    /// or the buffer length does not match `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<bool>) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "mask dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = u64::from(width) * u64::from(height);
        if pixels.len() as u64 != expected {
            return Err(PipelineError::InvalidArgument(format!(
                "mask buffer has {} pixels, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a mask by evaluating `f(x, y)` for every pixel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if a dimension is zero.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> bool,
    ) -> Result<Self, PipelineError> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` is foreground. Coordinates outside the mask are
    /// background, so callers can probe neighbours without bounds checks.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some_and(|i| self.pixels[i])
    }

    /// Set `(x, y)`; out-of-range coordinates are ignored.
    pub(crate) fn set(&mut self, x: i64, y: i64, value: bool) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = value;
        }
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn count_foreground(&self) -> u64 {
        self.pixels.iter().map(|&p| u64::from(p)).sum()
    }

    /// Row-major foreground flags.
    #[must_use]
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// Render as an 8-bit image: foreground 255, background 0.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(i64::from(x), i64::from(y)) {
                255
            } else {
                0
            }])
        })
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(y as usize * self.width as usize + x as usize)
    }
}

/// Unvalidated wire form of a [`BinaryMask`].
#[derive(Deserialize)]
struct RawMask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl TryFrom<RawMask> for BinaryMask {
    type Error = PipelineError;

    fn try_from(raw: RawMask) -> Result<Self, PipelineError> {
        Self::new(raw.width, raw.height, raw.pixels)
    }
}

/// A [`BinaryMask`] that has been thinned to a 1-pixel-wide skeleton.
///
/// Only the [`Skeletonizer`](crate::skeleton::Skeletonizer) creates one,
/// so it serializes but does not deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skeleton(BinaryMask);

impl Skeleton {
    pub(crate) const fn new(mask: BinaryMask) -> Self {
        Self(mask)
    }

    /// The thinned mask.
    #[must_use]
    pub const fn mask(&self) -> &BinaryMask {
        &self.0
    }
}
