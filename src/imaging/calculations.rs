//! Pure calculation functions for thumbnail dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Target box for a request: the original's dimensions with each non-zero
/// bound substituted in.
///
/// # Examples
/// ```
/// # use folio::imaging::bounding_box;
/// // Width-only request keeps the original height as the vertical bound
/// assert_eq!(bounding_box((800, 600), 100, 0), (100, 600));
/// assert_eq!(bounding_box((800, 600), 0, 0), (800, 600));
/// ```
pub fn bounding_box(original: (u32, u32), max_width: u32, max_height: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let w = if max_width != 0 { max_width } else { orig_w };
    let h = if max_height != 0 { max_height } else { orig_h };
    (w, h)
}

/// Whether the box is at least as large as the original on both axes, in
/// which case there is nothing to shrink.
pub fn fits_without_resize(original: (u32, u32), bbox: (u32, u32)) -> bool {
    bbox.0 >= original.0 && bbox.1 >= original.1
}

/// Largest size with the original's aspect ratio that fits in `bbox`.
///
/// Never upscales. Each side is rounded and kept at least one pixel.
///
/// # Arguments
/// * `original` - Original image dimensions (width, height)
/// * `bbox` - Bounding box (width, height)
///
/// # Returns
/// * `(width, height)` - Output dimensions, both `<=` the original's
pub fn fit_within(original: (u32, u32), bbox: (u32, u32)) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || orig_h == 0 {
        return original;
    }

    let scale = (bbox.0 as f64 / orig_w as f64)
        .min(bbox.1 as f64 / orig_h as f64)
        .min(1.0);

    let w = ((orig_w as f64 * scale).round() as u32).max(1);
    let h = ((orig_h as f64 * scale).round() as u32).max(1);
    (w, h)
}
