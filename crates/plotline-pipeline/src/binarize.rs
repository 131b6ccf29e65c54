//! Fixed-threshold binarization.
//!
//! Line drawings are assumed to be dark ink on a light background:
//! a pixel is foreground when its intensity is at or below the
//! threshold. Inverted (light-on-dark) drawings are not detected and
//! must be inverted by the caller.

use image::GrayImage;

use crate::mask::BinaryMask;
use crate::stage::Stage;
use crate::types::PipelineError;

/// Stage 1: grayscale image to binary foreground mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binarizer {
    threshold: u8,
}

impl Binarizer {
    /// Create a binarizer with an integer threshold.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] unless `threshold` is
    /// in `0..=255`.
    pub fn new(threshold: i32) -> Result<Self, PipelineError> {
        let threshold = u8::try_from(threshold).map_err(|_| {
            PipelineError::InvalidArgument(format!("threshold must be in 0..=255, got {threshold}"))
        })?;
        Ok(Self { threshold })
    }

    /// The cutoff intensity.
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl Stage<&GrayImage> for Binarizer {
    type Output = BinaryMask;

    fn name(&self) -> &'static str {
        "binarize"
    }

    fn run(&self, image: &GrayImage) -> Result<BinaryMask, PipelineError> {
        let mask = binarize(image, self.threshold)?;
        tracing::debug!(
            threshold = self.threshold,
            foreground = mask.count_foreground(),
            "binarized image"
        );
        Ok(mask)
    }
}

/// Mark every pixel with intensity `<= threshold` as foreground.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidArgument`] if the image has a zero
/// dimension.
pub fn binarize(image: &GrayImage, threshold: u8) -> Result<BinaryMask, PipelineError> {
    BinaryMask::from_fn(image.width(), image.height(), |x, y| {
        image.get_pixel(x, y).0[0] <= threshold
    })
}
