//! Pure calculation functions for image dimensions and size accounting.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output dimensions for a longer-edge bound.
///
/// Returns `None` when both edges already fit within `max_dimension`, meaning
/// no resize is needed. Otherwise a single scale factor
/// `max_dimension / longer_edge` is applied to both edges: the longer edge
/// lands exactly on the bound and the shorter edge is rounded.
///
/// # Examples
/// ```
/// # use imgnorm::imaging::bounded_dimensions;
/// // 4000x3000 bounded to 2560 → 2560x1920
/// assert_eq!(bounded_dimensions((4000, 3000), 2560), Some((2560, 1920)));
///
/// // Already small enough → no resize
/// assert_eq!(bounded_dimensions((800, 600), 2560), None);
/// ```
pub fn bounded_dimensions(source: (u32, u32), max_dimension: u32) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    if src_w <= max_dimension && src_h <= max_dimension {
        return None;
    }

    let longer = src_w.max(src_h);
    let scale = max_dimension as f64 / longer as f64;

    let scaled = |edge: u32| -> u32 { ((edge as f64 * scale).round() as u32).max(1) };

    if src_w >= src_h {
        // Landscape or square: width is the longer edge
        Some((max_dimension, scaled(src_h)))
    } else {
        // Portrait: height is the longer edge
        Some((scaled(src_w), max_dimension))
    }
}

/// Percentage of bytes saved going from `original` to `optimized`.
///
/// Computed as `(original − optimized) / original × 100`. An empty original
/// reports `0.0` instead of dividing by zero. Negative when the output grew.
pub fn reduction_percent(original: u64, optimized: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - optimized as f64) / original as f64 * 100.0
}
