//! Shared test utilities for the folio test suite.
//!
//! Provides fixture builders for markdown documents and synthetic images,
//! plus lookup helpers that panic with a clear message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let storage = MemoryStorage::new()
//!     .with_file("a.md", md("a", "2024-01-01", "categories: rust\n"));
//! let repo = repo_at(storage, "2024-03-01");
//!
//! let live = repo.list_live().unwrap();
//! assert_eq!(ids(&live), vec!["a"]);
//! assert_eq!(find_doc(&live, "a").title(), "Title of a");
//! ```

use chrono::NaiveDate;
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::sync::Arc;

use crate::content::{ContentRepository, Document};
use crate::storage::MemoryStorage;

// =========================================================================
// Document fixtures
// =========================================================================

/// A markdown document with `id`, a derived title, `date`, and any extra
/// front-matter lines (each terminated by `\n`).
pub fn md(id: &str, date: &str, extra: &str) -> String {
    format!("---\nid: {id}\ntitle: Title of {id}\ndate: {date}\n{extra}---\nBody of {id}.\n")
}

/// Repository over in-memory storage with "today" pinned.
pub fn repo_at(storage: MemoryStorage, today: &str) -> ContentRepository {
    ContentRepository::new(Arc::new(storage)).with_today(day(today))
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("bad fixture date '{s}': {e}"))
}

// =========================================================================
// Image fixtures
// =========================================================================

/// A valid JPEG with a gradient so encoders have something to compress.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// A valid RGBA PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a document by id. Panics if not found.
pub fn find_doc<'a>(docs: &'a [Document], id: &str) -> &'a Document {
    docs.iter().find(|d| d.id() == id).unwrap_or_else(|| {
        let available = ids(docs);
        panic!("document '{id}' not found. Available: {available:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All document ids in slice order.
pub fn ids(docs: &[Document]) -> Vec<&str> {
    docs.iter().map(|d| d.id()).collect()
}
