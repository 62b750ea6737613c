//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` |
//! | **Encode** | original format; JPEG at configured quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for bounding-box math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, Dimensions, ImageBackend};
pub use calculations::{bounding_box, fit_within, fits_without_resize};
pub use params::{Quality, ResizeParams};
pub use rust_backend::RustBackend;
