//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! single-channel grayscale image for the [`Binarizer`](crate::binarize::Binarizer).
//!
//! Images with an alpha channel are composited over white first. The
//! upstream background-removal step writes transparent PNGs whose hidden
//! colour is usually black, and reading that as ink would turn the whole
//! background into foreground.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};

use crate::stage::Stage;
use crate::types::PipelineError;

/// Stage 0: bytes to grayscale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decoder;

impl Stage<&[u8]> for Decoder {
    type Output = GrayImage;

    fn name(&self) -> &'static str {
        "decode"
    }

    fn run(&self, bytes: &[u8]) -> Result<GrayImage, PipelineError> {
        decode_and_grayscale(bytes)
    }
}

/// Decode raw image bytes and convert to grayscale.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty or the
/// image has zero width or height.
/// Returns [`PipelineError::ImageRead`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }

    let gray = if img.color().has_alpha() {
        flatten_onto_white(&img).to_luma8()
    } else {
        img.to_luma8()
    };
    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        "decoded input image"
    );
    Ok(gray)
}

/// Composite an image with alpha over an opaque white background.
fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| {
            let c = u16::from(c);
            let a = u16::from(a);
            // (c*a + 255*(255-a)) / 255, rounded; always fits in u8.
            let v = (c * a + 255 * (255 - a) + 127) / 255;
            u8::try_from(v).unwrap_or(u8::MAX)
        };
        Rgb([blend(r), blend(g), blend(b)])
    });
    DynamicImage::ImageRgb8(rgb)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn decoder_stage_matches_free_function() {
        let img = image::RgbaImage::from_fn(4, 3, |x, y| {
            image::Rgba(if (x + y) % 2 == 0 {
                [0, 0, 0, 255]
            } else {
                [200, 200, 200, 128]
            })
        });
        let bytes = encode_png(&img);
        assert_eq!(Decoder.name(), "decode");
        assert_eq!(
            Decoder.run(bytes.as_slice()).unwrap(),
            decode_and_grayscale(&bytes).unwrap()
        );
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_and_grayscale(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_read_error() {
        let result = decode_and_grayscale(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageRead(_))));
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = image::RgbaImage::from_fn(17, 31, |_, _| image::Rgba([128, 64, 32, 255]));
        let gray = decode_and_grayscale(&encode_png(&img)).unwrap();
        assert_eq!(gray.width(), 17);
        assert_eq!(gray.height(), 31);
    }

    #[test]
    fn opaque_black_and_white_survive() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let gray = decode_and_grayscale(&encode_png(&img)).unwrap();
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn transparent_pixels_read_as_white() {
        // Fully transparent black must not become ink.
        let img = image::RgbaImage::from_fn(3, 3, |_, _| image::Rgba([0, 0, 0, 0]));
        let gray = decode_and_grayscale(&encode_png(&img)).unwrap();
        for pixel in gray.pixels() {
            assert_eq!(pixel.0[0], 255);
        }
    }

    #[test]
    fn half_transparent_black_reads_as_mid_gray() {
        let img = image::RgbaImage::from_fn(1, 1, |_, _| image::Rgba([0, 0, 0, 128]));
        let gray = decode_and_grayscale(&encode_png(&img)).unwrap();
        let v = gray.get_pixel(0, 0).0[0];
        assert!((120..=135).contains(&v), "got {v}");
    }
}
