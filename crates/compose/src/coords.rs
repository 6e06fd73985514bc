//! Viewer-to-page coordinate conversion.
//!
//! Edit geometry is stored in viewer space (top-left origin, y growing
//! downward); PDF page space has a bottom-left origin with y growing upward.
//! The flip lives here, in one conversion function per edit kind, and
//! nowhere else.

/// Baseline y for drawn text, in page space.
///
/// The 0.8 × font-size offset is an empirical cap-height approximation: the
/// stored y is the top of the text box, the draw origin is the baseline.
pub fn text_baseline_y(page_height: f32, y: f32, font_size: f32) -> f32 {
    page_height - y - font_size * 0.8
}

/// Bottom-left y for a drawn image, in page space.
///
/// Images anchor from their top-left in viewer space but draw from their
/// bottom-left in page space, hence the full-height offset.
pub fn image_origin_y(page_height: f32, y: f32, height: f32) -> f32 {
    page_height - y - height
}
