//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the downscaled size for a width-bounded decode.
///
/// Returns `None` when no resize is needed: `max_width` is 0 (full size
/// requested) or the source already fits. Otherwise the width becomes
/// `max_width` and the height follows the source aspect ratio, rounded and
/// never below one pixel.
///
/// # Examples
/// ```
/// # use filmstrip::imaging::calculate_scaled_dimensions;
/// // 4000x3000 capped at 120px wide → 120x90
/// assert_eq!(calculate_scaled_dimensions((4000, 3000), 120), Some((120, 90)));
///
/// // Already narrow enough → untouched
/// assert_eq!(calculate_scaled_dimensions((100, 80), 120), None);
/// ```
pub fn calculate_scaled_dimensions(source: (u32, u32), max_width: u32) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    if max_width == 0 || src_w <= max_width || src_w == 0 {
        return None;
    }

    let h = (src_h as f64 * max_width as f64 / src_w as f64).round() as u32;
    Some((max_width, h.max(1)))
}
