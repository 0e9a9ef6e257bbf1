//! Pure calculation functions shared by the engines.
//!
//! All functions here are pure and testable without any I/O or images.

/// Normalize an extension hint: drop a leading dot and lowercase it.
///
/// ```
/// # use engine_proxy::imaging::normalize_extension;
/// assert_eq!(normalize_extension(".JPG"), "jpg");
/// assert_eq!(normalize_extension("webp"), "webp");
/// ```
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Turn `(left, top, right, bottom)` edges into an `(x, y, width, height)`
/// region inside an image of `size`.
///
/// Right and bottom edges are exclusive and clamped to the image bounds.
/// Returns `None` when nothing is left to keep.
pub fn crop_region(
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
    size: (u32, u32),
) -> Option<(u32, u32, u32, u32)> {
    let (width, height) = size;
    let right = right.min(width);
    let bottom = bottom.min(height);
    if left >= right || top >= bottom {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

/// Byte length of an RGBA8 buffer for an image of `size`.
pub fn rgba_len(size: (u32, u32)) -> usize {
    size.0 as usize * size.1 as usize * 4
}
