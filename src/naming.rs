//! Filename convention for derived (resized) images.
//!
//! A thumbnail of `images/<name>` bounded by `w × h` lives next to its
//! original as `images/<w>-<h>-<name>`. Either bound may be `0`, meaning
//! "unconstrained on that axis":
//!
//! - `diagram.png` at `w=100` → `100-0-diagram.png`
//! - `diagram.png` at `h=300` → `0-300-diagram.png`
//! - `my-photo.jpg` at `640×480` → `640-480-my-photo.jpg`
//!
//! The key `(w, h, name)` is the whole cache identity. There is no hash of
//! the source, so a changed original keeps serving its old derivatives until
//! they are deleted by hand.

/// Directory, relative to the content root, holding originals and derivatives.
pub const IMAGES_DIR: &str = "images";

/// Result of parsing a derived image filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedName {
    pub width: u32,
    pub height: u32,
    /// Name of the original the derivative was produced from.
    pub original: String,
}

/// Filename of the derivative of `original` bounded by `width × height`.
pub fn derived_name(width: u32, height: u32, original: &str) -> String {
    format!("{}-{}-{}", width, height, original)
}

/// Storage path of the derivative of `original` bounded by `width × height`.
pub fn derived_path(width: u32, height: u32, original: &str) -> String {
    format!("{}/{}", IMAGES_DIR, derived_name(width, height, original))
}

/// Storage path of an original image.
pub fn original_path(name: &str) -> String {
    format!("{}/{}", IMAGES_DIR, name)
}

/// Parse `<w>-<h>-<name>`.
///
/// Returns `None` when the name does not start with two numeric segments or
/// the remaining name is empty. An original whose own name happens to look
/// like `12-34-x.png` is indistinguishable from a derivative; the listing in
/// `check` is the only consumer that cares.
pub fn parse_derived_name(filename: &str) -> Option<DerivedName> {
    let mut parts = filename.splitn(3, '-');
    let width = parts.next()?.parse::<u32>().ok()?;
    let height = parts.next()?.parse::<u32>().ok()?;
    let original = parts.next()?;
    if original.is_empty() {
        return None;
    }
    Some(DerivedName {
        width,
        height,
        original: original.to_string(),
    })
}

/// Whether an image name is safe to use as a single path segment.
pub fn is_valid_image_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_name_width_only() {
        assert_eq!(derived_name(100, 0, "diagram.png"), "100-0-diagram.png");
    }

    #[test]
    fn derived_path_lives_in_images_dir() {
        assert_eq!(
            derived_path(640, 480, "my-photo.jpg"),
            "images/640-480-my-photo.jpg"
        );
        assert_eq!(original_path("my-photo.jpg"), "images/my-photo.jpg");
    }

    #[test]
    fn parse_derived_with_dashed_original() {
        let d = parse_derived_name("640-480-my-photo.jpg").unwrap();
        assert_eq!(d.width, 640);
        assert_eq!(d.height, 480);
        assert_eq!(d.original, "my-photo.jpg");
    }

    #[test]
    fn parse_derived_zero_bounds() {
        let d = parse_derived_name("0-300-a.png").unwrap();
        assert_eq!((d.width, d.height), (0, 300));
    }

    #[test]
    fn parse_rejects_plain_names() {
        assert_eq!(parse_derived_name("my-photo.jpg"), None);
        assert_eq!(parse_derived_name("100-photo.jpg"), None);
        assert_eq!(parse_derived_name("photo.jpg"), None);
    }

    #[test]
    fn parse_rejects_empty_original() {
        assert_eq!(parse_derived_name("100-200-"), None);
    }

    #[test]
    fn image_name_validation() {
        assert!(is_valid_image_name("photo.jpg"));
        assert!(is_valid_image_name("my-photo.v2.jpg"));
        assert!(!is_valid_image_name(""));
        assert!(!is_valid_image_name("../photo.jpg"));
        assert!(!is_valid_image_name("sub/photo.jpg"));
        assert!(!is_valid_image_name("sub\\photo.jpg"));
    }
}
