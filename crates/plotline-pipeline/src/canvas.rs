//! Mapping image pixels onto the output document.
//!
//! Without a physical canvas the document is the image itself: one user
//! unit per pixel. With one, the image is scaled uniformly to fit inside
//! the canvas minus a fixed margin on every side and centred in the
//! remaining space.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;
use crate::types::{CanvasSize, Dimensions, PipelineError};

/// Margin kept clear on each side of a physical canvas, in millimetres.
pub const MARGIN_MM: f64 = 2.0;

/// Output document size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanvasMode {
    /// Document measured in image pixels.
    Pixels {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Document measured in millimetres.
    Millimetres {
        /// Width in millimetres.
        width_mm: f64,
        /// Height in millimetres.
        height_mm: f64,
    },
}

/// Uniform scale plus translation from image pixels to document units.
///
/// Image point `(x, y)` lands at
/// `(translate_x + scale * x, translate_y + scale * y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasTransform {
    /// Document size and unit.
    pub mode: CanvasMode,
    /// Document units per image pixel.
    pub scale: f64,
    /// Horizontal offset in document units.
    pub translate_x: f64,
    /// Vertical offset in document units.
    pub translate_y: f64,
    /// Stroke width in image pixels, chosen so the drawn line is one
    /// document unit wide after scaling.
    pub stroke_width: f64,
}

impl CanvasTransform {
    /// Identity mapping for a pixel-sized document.
    #[must_use]
    pub const fn pixels(dimensions: Dimensions) -> Self {
        Self {
            mode: CanvasMode::Pixels {
                width: dimensions.width,
                height: dimensions.height,
            },
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            stroke_width: 1.0,
        }
    }

    /// `true` for millimetre documents.
    #[must_use]
    pub const fn is_physical(&self) -> bool {
        matches!(self.mode, CanvasMode::Millimetres { .. })
    }
}

/// Stage 7: image dimensions to canvas transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CanvasMapper {
    /// Target physical canvas, or `None` for pixel output.
    pub canvas: Option<CanvasSize>,
}

impl Stage<Dimensions> for CanvasMapper {
    type Output = CanvasTransform;

    fn name(&self) -> &'static str {
        "canvas"
    }

    fn run(&self, dimensions: Dimensions) -> Result<CanvasTransform, PipelineError> {
        let transform = match self.canvas {
            None => CanvasTransform::pixels(dimensions),
            Some(canvas) => fit_to_canvas(dimensions, canvas)?,
        };
        tracing::debug!(
            scale = transform.scale,
            translate_x = transform.translate_x,
            translate_y = transform.translate_y,
            physical = transform.is_physical(),
            "mapped canvas"
        );
        Ok(transform)
    }
}

/// Scale `dimensions` to fit inside `canvas` less [`MARGIN_MM`] per side,
/// centred.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidArgument`] if the canvas is invalid
/// (see [`CanvasSize::validate`]) or the image has a zero dimension.
pub fn fit_to_canvas(
    dimensions: Dimensions,
    canvas: CanvasSize,
) -> Result<CanvasTransform, PipelineError> {
    canvas.validate()?;
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "cannot map a {}x{} image onto a canvas",
            dimensions.width, dimensions.height
        )));
    }

    let image_w = f64::from(dimensions.width);
    let image_h = f64::from(dimensions.height);
    let available_w = 2.0f64.mul_add(-MARGIN_MM, canvas.width_mm);
    let available_h = 2.0f64.mul_add(-MARGIN_MM, canvas.height_mm);

    let scale = (available_w / image_w).min(available_h / image_h);
    let translate_x = MARGIN_MM + image_w.mul_add(-scale, available_w) / 2.0;
    let translate_y = MARGIN_MM + image_h.mul_add(-scale, available_h) / 2.0;

    Ok(CanvasTransform {
        mode: CanvasMode::Millimetres {
            width_mm: canvas.width_mm,
            height_mm: canvas.height_mm,
        },
        scale,
        translate_x,
        translate_y,
        stroke_width: 1.0 / scale,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn canvas(width_mm: f64, height_mm: f64) -> CanvasSize {
        CanvasSize {
            width_mm,
            height_mm,
        }
    }

    #[test]
    fn pixel_mode_is_identity() {
        let t = CanvasMapper { canvas: None }.run(dims(640, 480)).unwrap();
        assert_eq!(
            t.mode,
            CanvasMode::Pixels {
                width: 640,
                height: 480
            }
        );
        assert!((t.scale - 1.0).abs() < f64::EPSILON);
        assert!(t.translate_x.abs() < f64::EPSILON);
        assert!(t.translate_y.abs() < f64::EPSILON);
        assert!((t.stroke_width - 1.0).abs() < f64::EPSILON);
        assert!(!t.is_physical());
    }

    #[test]
    fn square_image_on_landscape_canvas() {
        let t = fit_to_canvas(dims(512, 512), canvas(115.0, 85.0)).unwrap();
        assert!((t.scale - 81.0 / 512.0).abs() < 1e-12);
        assert!((t.translate_x - 17.0).abs() < 1e-9);
        assert!((t.translate_y - 2.0).abs() < 1e-9);
        assert!((t.stroke_width - 512.0 / 81.0).abs() < 1e-9);
        assert!((t.stroke_width - 6.3210).abs() < 1e-4);
        assert!(t.is_physical());
    }

    #[test]
    fn wide_image_is_limited_by_width() {
        let t = fit_to_canvas(dims(1000, 100), canvas(104.0, 104.0)).unwrap();
        // Available 100x100 mm; width-limited at 0.1 mm/px.
        assert!((t.scale - 0.1).abs() < 1e-12);
        assert!((t.translate_x - 2.0).abs() < 1e-9);
        assert!((t.translate_y - 47.0).abs() < 1e-9);
    }

    #[test]
    fn scaled_image_fits_inside_margins() {
        for (w, h, cw, ch) in [
            (300, 200, 210.0, 297.0),
            (17, 999, 50.0, 50.0),
            (1, 1, 5.0, 5.0),
        ] {
            let t = fit_to_canvas(dims(w, h), canvas(cw, ch)).unwrap();
            let right = t.scale.mul_add(f64::from(w), t.translate_x);
            let bottom = t.scale.mul_add(f64::from(h), t.translate_y);
            assert!(t.translate_x >= MARGIN_MM - 1e-9);
            assert!(t.translate_y >= MARGIN_MM - 1e-9);
            assert!(right <= cw - MARGIN_MM + 1e-9);
            assert!(bottom <= ch - MARGIN_MM + 1e-9);
        }
    }

    #[test]
    fn invalid_canvas_is_rejected() {
        for (cw, ch) in [(0.0, 85.0), (115.0, -3.0), (4.0, 85.0), (115.0, 3.9)] {
            let result = CanvasMapper {
                canvas: Some(canvas(cw, ch)),
            }
            .run(dims(100, 100));
            assert!(
                matches!(result, Err(PipelineError::InvalidArgument(_))),
                "expected {cw}x{ch} to be rejected"
            );
        }
    }

    #[test]
    fn transform_serializes_with_mode_tag() {
        let t = CanvasTransform::pixels(dims(10, 20));
        let json = serde_json::to_value(t).unwrap();
        assert_eq!(json["mode"]["kind"], "pixels");
        assert_eq!(json["mode"]["width"], 10);
    }
}
