//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::ImageReader::with_guessed_format` |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → other formats | `image::DynamicImage::write_to` |
//!
//! Derivatives keep the original's format so the `{w}-{h}-{name}` file
//! carries the same extension and MIME type as its source.

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::params::ResizeParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats whose decoders are compiled in.
const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode `img` as `format`. JPEG has no alpha channel, so it goes through
/// RGB8 first.
fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    quality: u32,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality as u8);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        }
        other => {
            img.write_to(&mut Cursor::new(&mut buf), other)
                .map_err(|e| BackendError::ProcessingFailed(format!("{other:?} encode failed: {e}")))?;
        }
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader
            .format()
            .filter(|f| SUPPORTED_FORMATS.contains(f))
            .ok_or_else(|| BackendError::Decode("unrecognised image format".to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| BackendError::Decode(format!("{format:?}: {e}")))?;
        Ok(DecodedImage { image, format })
    }

    fn resize(
        &self,
        source: &DecodedImage,
        params: &ResizeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let resized = source
            .image
            .resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode_image(&resized, source.format, params.quality.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{jpeg_bytes, png_bytes};

    fn params(width: u32, height: u32) -> ResizeParams {
        ResizeParams {
            width,
            height,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let decoded = RustBackend::new().decode(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.image.width(), 200);
        assert_eq!(decoded.image.height(), 150);
        assert_eq!(decoded.content_type(), "image/jpeg");
    }

    #[test]
    fn decode_synthetic_png() {
        let decoded = RustBackend::new().decode(&png_bytes(64, 32)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.dimensions().width, 64);
    }

    #[test]
    fn decode_text_is_decode_error() {
        let result = RustBackend::new().decode(b"<svg xmlns='http://www.w3.org/2000/svg'/>");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_jpeg_stays_jpeg() {
        let backend = RustBackend::new();
        let source = backend.decode(&jpeg_bytes(400, 300)).unwrap();

        let out = backend.resize(&source, &params(100, 75)).unwrap();
        let again = backend.decode(&out).unwrap();
        assert_eq!(again.format, ImageFormat::Jpeg);
        assert_eq!((again.image.width(), again.image.height()), (100, 75));
    }

    #[test]
    fn resize_png_keeps_alpha_format() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_bytes(80, 40)).unwrap();

        let out = backend.resize(&source, &params(40, 20)).unwrap();
        let again = backend.decode(&out).unwrap();
        assert_eq!(again.format, ImageFormat::Png);
        assert_eq!((again.image.width(), again.image.height()), (40, 20));
    }

    #[test]
    fn jpeg_quality_affects_size() {
        let backend = RustBackend::new();
        let source = backend.decode(&jpeg_bytes(300, 300)).unwrap();

        let low = backend
            .resize(
                &source,
                &ResizeParams {
                    width: 200,
                    height: 200,
                    quality: Quality::new(10),
                },
            )
            .unwrap();
        let high = backend
            .resize(
                &source,
                &ResizeParams {
                    width: 200,
                    height: 200,
                    quality: Quality::new(100),
                },
            )
            .unwrap();
        assert!(low.len() < high.len());
    }
}
