//! Write-once thumbnail cache.
//!
//! Originals live under `images/` in the content root. A request for
//! `(name, w, h)` produces a copy that fits inside a `w × h` box, keeping the
//! aspect ratio and never upscaling, and persists it next to the original as
//! `images/{w}-{h}-{name}` (see [`crate::naming`]). Later requests for the
//! same key are served from that file without decoding anything.
//!
//! ## Resolution order
//!
//! | Step | Condition | Result |
//! |---|---|---|
//! | 1 | name empty or not a single path segment | `NotFound` |
//! | 2 | `w == 0 && h == 0` | original bytes |
//! | 3 | derived file exists | derived bytes, no decode |
//! | 4 | original missing / not decodable | `NotFound` / `UnsupportedMediaKind` |
//! | 5 | box ≥ original on both axes | original bytes |
//! | 6 | otherwise | resize, persist, return |
//!
//! A `0` bound means "unconstrained on that axis" and takes the original's
//! size for that side of the box.
//!
//! ## Concurrency
//!
//! There are no locks. Two requests racing on the same key both generate;
//! the storage layer writes whole files atomically, so the loser simply
//! replaces the file with identical bytes.
//!
//! ## No invalidation
//!
//! The key does not include the original's content. Replacing an original
//! keeps serving stale derivatives until they are deleted by hand.

use crate::imaging::{
    BackendError, ImageBackend, Quality, ResizeParams, bounding_box, fit_within,
    fits_without_resize,
};
use crate::naming::{
    DerivedName, IMAGES_DIR, derived_path, is_valid_image_name, original_path, parse_derived_name,
};
use crate::storage::{Storage, StorageError};
use image::ImageFormat;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Not a resizable image: {0}")]
    UnsupportedMediaKind(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Image backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Where the bytes of a [`Thumbnail`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOrigin {
    /// The untouched original.
    Original,
    /// A derivative persisted by an earlier request.
    Cached,
    /// A derivative produced by this request.
    Generated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub origin: ThumbnailOrigin,
}

/// MIME type from a file name's extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if ext.eq_ignore_ascii_case("svg") {
        return "image/svg+xml";
    }
    ImageFormat::from_extension(ext)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// MIME type sniffed from the bytes, falling back to the name's extension.
///
/// Matches what a decode of the same bytes reports, so every origin of one
/// key carries the same content type.
pub fn content_type_of(name: &str, bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type(),
        Err(_) => content_type_for(name),
    }
}

pub struct ThumbnailCache {
    storage: Arc<dyn Storage>,
    backend: Arc<dyn ImageBackend>,
    quality: Quality,
}

impl ThumbnailCache {
    pub fn new(storage: Arc<dyn Storage>, backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            storage,
            backend,
            quality: Quality::default(),
        }
    }

    /// JPEG quality for generated derivatives.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    fn read_original(&self, name: &str) -> Result<Vec<u8>, ThumbnailError> {
        match self.storage.read_bytes(&original_path(name)) {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => Err(ThumbnailError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn original(&self, name: &str) -> Result<Thumbnail, ThumbnailError> {
        let bytes = self.read_original(name)?;
        Ok(Thumbnail {
            content_type: content_type_of(name, &bytes).to_string(),
            bytes,
            origin: ThumbnailOrigin::Original,
        })
    }

    /// Return a copy of `images/{name}` bounded by `max_width × max_height`,
    /// generating and persisting it on first request.
    pub fn get_or_create(
        &self,
        name: &str,
        max_width: u32,
        max_height: u32,
    ) -> Result<Thumbnail, ThumbnailError> {
        if !is_valid_image_name(name) {
            return Err(ThumbnailError::NotFound(name.to_string()));
        }

        if max_width == 0 && max_height == 0 {
            return self.original(name);
        }

        let derived = derived_path(max_width, max_height, name);
        if self.storage.exists(&derived) {
            log::debug!("thumbnail cache hit: {derived}");
            let bytes = self.storage.read_bytes(&derived)?;
            return Ok(Thumbnail {
                content_type: content_type_of(name, &bytes).to_string(),
                bytes,
                origin: ThumbnailOrigin::Cached,
            });
        }

        let bytes = self.read_original(name)?;
        let decoded = match self.backend.decode(&bytes) {
            Ok(decoded) => decoded,
            Err(BackendError::Decode(reason)) => {
                log::debug!("{name} is not resizable: {reason}");
                return Err(ThumbnailError::UnsupportedMediaKind(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let dims = decoded.dimensions();
        let original = (dims.width, dims.height);
        let bbox = bounding_box(original, max_width, max_height);
        if fits_without_resize(original, bbox) {
            return Ok(Thumbnail {
                bytes,
                content_type: decoded.content_type().to_string(),
                origin: ThumbnailOrigin::Original,
            });
        }

        let (width, height) = fit_within(original, bbox);
        let resized = self.backend.resize(
            &decoded,
            &ResizeParams {
                width,
                height,
                quality: self.quality,
            },
        )?;
        self.storage.write(&derived, &resized)?;
        log::info!(
            "generated {derived} ({}x{} -> {width}x{height})",
            original.0,
            original.1
        );

        Ok(Thumbnail {
            bytes: resized,
            content_type: decoded.content_type().to_string(),
            origin: ThumbnailOrigin::Generated,
        })
    }

    /// [`get_or_create`](Self::get_or_create), falling back to the original
    /// bytes for files that cannot be decoded (SVGs, PDFs, corrupt images).
    pub fn serve(
        &self,
        name: &str,
        max_width: u32,
        max_height: u32,
    ) -> Result<Thumbnail, ThumbnailError> {
        match self.get_or_create(name, max_width, max_height) {
            Err(ThumbnailError::UnsupportedMediaKind(_)) => self.original(name),
            other => other,
        }
    }
}

/// Derivatives currently stored under `images/`, sorted by filename.
///
/// A file only counts when its parsed original is also present, so an
/// original that merely looks like `12-34-x.png` is not reported.
pub fn list_derivatives(storage: &dyn Storage) -> Result<Vec<DerivedName>, StorageError> {
    let files = match storage.list(IMAGES_DIR) {
        Ok(files) => files,
        Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(files
        .iter()
        .filter_map(|path| parse_derived_name(path.rsplit('/').next().unwrap_or(path)))
        .filter(|derived| storage.exists(&original_path(&derived.original)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::storage::{LocalStorage, MemoryStorage};
    use crate::test_helpers::jpeg_bytes;

    fn mock_cache(
        width: u32,
        height: u32,
    ) -> (ThumbnailCache, Arc<MemoryStorage>, Arc<MockBackend>) {
        let storage = Arc::new(MemoryStorage::new().with_file("images/photo.png", "PNGDATA"));
        let backend = Arc::new(MockBackend::with_dimensions(width, height));
        let cache = ThumbnailCache::new(storage.clone(), backend.clone());
        (cache, storage, backend)
    }

    // =========================================================================
    // Resolution order
    // =========================================================================

    #[test]
    fn zero_bounds_pass_through_original() {
        let (cache, _, backend) = mock_cache(800, 600);
        let thumb = cache.get_or_create("photo.png", 0, 0).unwrap();

        assert_eq!(thumb.bytes, b"PNGDATA");
        assert_eq!(thumb.origin, ThumbnailOrigin::Original);
        assert_eq!(thumb.content_type, "image/png");
        assert_eq!(backend.decode_count(), 0);
    }

    #[test]
    fn first_request_generates_and_persists() {
        let (cache, storage, backend) = mock_cache(800, 600);
        let thumb = cache.get_or_create("photo.png", 100, 0).unwrap();

        assert_eq!(thumb.origin, ThumbnailOrigin::Generated);
        assert_eq!(thumb.bytes, b"resized 100x75");
        assert_eq!(
            storage.read_bytes("images/100-0-photo.png").unwrap(),
            b"resized 100x75"
        );
        assert!(backend.get_operations().contains(&RecordedOp::Resize {
            width: 100,
            height: 75,
            quality: 90,
        }));
    }

    #[test]
    fn second_request_is_cached_without_decode() {
        let (cache, _, backend) = mock_cache(800, 600);

        let first = cache.get_or_create("photo.png", 100, 0).unwrap();
        let second = cache.get_or_create("photo.png", 100, 0).unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(second.origin, ThumbnailOrigin::Cached);
        assert_eq!(backend.decode_count(), 1);
    }

    #[test]
    fn distinct_keys_are_distinct_files() {
        let (cache, storage, _) = mock_cache(800, 600);
        cache.get_or_create("photo.png", 100, 0).unwrap();
        cache.get_or_create("photo.png", 0, 100).unwrap();

        assert!(storage.exists("images/100-0-photo.png"));
        assert!(storage.exists("images/0-100-photo.png"));
        assert_eq!(
            storage.read_bytes("images/0-100-photo.png").unwrap(),
            b"resized 133x100"
        );
    }

    #[test]
    fn larger_box_returns_original_without_writing() {
        let (cache, storage, _) = mock_cache(50, 50);
        let thumb = cache.get_or_create("photo.png", 100, 0).unwrap();

        assert_eq!(thumb.bytes, b"PNGDATA");
        assert_eq!(thumb.origin, ThumbnailOrigin::Original);
        assert!(!storage.exists("images/100-0-photo.png"));
    }

    #[test]
    fn quality_reaches_backend() {
        let storage = Arc::new(MemoryStorage::new().with_file("images/p.jpg", "x"));
        let backend = Arc::new(MockBackend::with_dimensions(400, 400));
        let cache = ThumbnailCache::new(storage, backend.clone()).with_quality(Quality::new(60));
        cache.get_or_create("p.jpg", 200, 200).unwrap();

        assert!(backend.get_operations().contains(&RecordedOp::Resize {
            width: 200,
            height: 200,
            quality: 60,
        }));
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn missing_original_is_not_found() {
        let (cache, _, _) = mock_cache(800, 600);
        assert!(matches!(
            cache.get_or_create("nope.png", 100, 0),
            Err(ThumbnailError::NotFound(_))
        ));
        assert!(matches!(
            cache.get_or_create("nope.png", 0, 0),
            Err(ThumbnailError::NotFound(_))
        ));
    }

    #[test]
    fn traversal_names_are_not_found() {
        let (cache, _, backend) = mock_cache(800, 600);
        for name in ["", "../secret.png", "a/b.png", "..", "a\\b.png"] {
            assert!(
                matches!(
                    cache.get_or_create(name, 100, 0),
                    Err(ThumbnailError::NotFound(_))
                ),
                "{name:?} should be rejected"
            );
        }
        assert_eq!(backend.decode_count(), 0);
    }

    #[test]
    fn undecodable_original_is_unsupported() {
        let storage = Arc::new(MemoryStorage::new().with_file("images/doc.pdf", "%PDF-1.4"));
        let cache = ThumbnailCache::new(storage, Arc::new(MockBackend::new()));

        assert!(matches!(
            cache.get_or_create("doc.pdf", 100, 0),
            Err(ThumbnailError::UnsupportedMediaKind(_))
        ));
    }

    #[test]
    fn serve_falls_back_to_original_for_unsupported() {
        let storage = Arc::new(MemoryStorage::new().with_file("images/logo.svg", "<svg/>"));
        let cache = ThumbnailCache::new(storage.clone(), Arc::new(MockBackend::new()));

        let thumb = cache.serve("logo.svg", 100, 0).unwrap();
        assert_eq!(thumb.bytes, b"<svg/>");
        assert_eq!(thumb.content_type, "image/svg+xml");
        assert_eq!(thumb.origin, ThumbnailOrigin::Original);
        assert!(!storage.exists("images/100-0-logo.svg"));
    }

    #[test]
    fn serve_propagates_not_found() {
        let (cache, _, _) = mock_cache(800, 600);
        assert!(matches!(
            cache.serve("missing.png", 100, 0),
            Err(ThumbnailError::NotFound(_))
        ));
    }

    // =========================================================================
    // Content types
    // =========================================================================

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.svg"), "image/svg+xml");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    // =========================================================================
    // Real backend on disk
    // =========================================================================

    #[test]
    fn real_jpeg_is_resized_on_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("images")).unwrap();
        std::fs::write(tmp.path().join("images/photo.jpg"), jpeg_bytes(400, 200)).unwrap();

        let cache = ThumbnailCache::new(
            Arc::new(LocalStorage::new(tmp.path())),
            Arc::new(RustBackend::new()),
        );
        let thumb = cache.get_or_create("photo.jpg", 100, 0).unwrap();
        assert_eq!(thumb.origin, ThumbnailOrigin::Generated);
        assert_eq!(thumb.content_type, "image/jpeg");

        let on_disk = tmp.path().join("images/100-0-photo.jpg");
        assert_eq!(image::image_dimensions(&on_disk).unwrap(), (100, 50));

        let again = cache.get_or_create("photo.jpg", 100, 0).unwrap();
        assert_eq!(again.origin, ThumbnailOrigin::Cached);
        assert_eq!(again.bytes, thumb.bytes);
    }

    #[test]
    fn real_small_image_is_not_upscaled() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("images")).unwrap();
        let original = jpeg_bytes(60, 40);
        std::fs::write(tmp.path().join("images/small.jpg"), &original).unwrap();

        let cache = ThumbnailCache::new(
            Arc::new(LocalStorage::new(tmp.path())),
            Arc::new(RustBackend::new()),
        );
        let thumb = cache.get_or_create("small.jpg", 600, 400).unwrap();
        assert_eq!(thumb.bytes, original);
        assert!(!tmp.path().join("images/600-400-small.jpg").exists());
    }

    #[test]
    fn cached_content_type_follows_bytes_not_extension() {
        let storage = Arc::new(MemoryStorage::new().with_file("images/photo.png", jpeg_bytes(400, 200)));
        let cache = ThumbnailCache::new(storage, Arc::new(RustBackend::new()));

        let first = cache.get_or_create("photo.png", 100, 0).unwrap();
        let second = cache.get_or_create("photo.png", 100, 0).unwrap();
        assert_eq!(first.origin, ThumbnailOrigin::Generated);
        assert_eq!(second.origin, ThumbnailOrigin::Cached);
        assert_eq!(first.content_type, "image/jpeg");
        assert_eq!(second.content_type, first.content_type);

        let original = cache.get_or_create("photo.png", 0, 0).unwrap();
        assert_eq!(original.content_type, "image/jpeg");
    }

    #[test]
    fn content_type_of_sniffs_then_falls_back() {
        assert_eq!(content_type_of("x.png", &jpeg_bytes(4, 4)), "image/jpeg");
        assert_eq!(content_type_of("logo.svg", b"<svg/>"), "image/svg+xml");
    }

    // =========================================================================
    // Derivative listing
    // =========================================================================

    #[test]
    fn list_derivatives_reports_only_files_with_originals() {
        let storage = MemoryStorage::new()
            .with_file("images/photo.png", "P")
            .with_file("images/100-0-photo.png", "D1")
            .with_file("images/0-50-photo.png", "D2")
            .with_file("images/10-20-gone.png", "D3");

        let derived = list_derivatives(&storage).unwrap();
        let keys: Vec<_> = derived
            .iter()
            .map(|d| (d.width, d.height, d.original.as_str()))
            .collect();
        assert_eq!(keys, vec![(0, 50, "photo.png"), (100, 0, "photo.png")]);
    }

    #[test]
    fn list_derivatives_without_images_dir_is_empty() {
        let storage = MemoryStorage::new().with_file("a.md", "x");
        assert!(list_derivatives(&storage).unwrap().is_empty());
    }
}
