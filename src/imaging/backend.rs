//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the thumbnail cache
//! needs: decode an original, and produce a resized, re-encoded copy.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in the recording mock from [`tests`].

use super::params::ResizeParams;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded original together with the container format it came in.
///
/// The format is what derivatives are re-encoded as.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl DecodedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// MIME type of the original's format.
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Trait for image processing backends.
///
/// Backends work on in-memory bytes so the caller decides where originals
/// come from and where derivatives are persisted.
pub trait ImageBackend: Send + Sync {
    /// Sniff the format and decode. Anything that is not a decodable raster
    /// image is a [`BackendError::Decode`].
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Resize to exactly `params.width × params.height` and encode in the
    /// source's format.
    fn resize(&self, source: &DecodedImage, params: &ResizeParams)
    -> Result<Vec<u8>, BackendError>;
}
