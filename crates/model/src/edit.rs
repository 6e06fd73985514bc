//! Annotation edit data model.
//!
//! Edits are immutable-shaped values: changing one produces a new value with
//! the same id. All coordinates are viewer-space page points (top-left
//! origin, unscaled); the export layer flips them into PDF page space.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Default content for a freshly placed text edit.
pub const DEFAULT_TEXT: &str = "New Text";
/// Default font size for new text edits, in points.
pub const DEFAULT_FONT_SIZE: f32 = 14.0;
/// Default font family for new text edits.
pub const DEFAULT_FONT_FAMILY: &str = "Helvetica";
/// Display width assigned to newly inserted images, in points.
pub const DEFAULT_IMAGE_WIDTH: f32 = 200.0;

/// Unique identifier for an edit.
///
/// Stable for the edit's lifetime and never reused within a session.
/// Serializes as an opaque string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditId(Uuid);

impl EditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A point in viewer page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned edit geometry: top-left corner plus size, in page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Raster formats accepted for image edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Sniff the format from the payload's content signature.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8]) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }
}

/// An embedded raster image, referenced by content.
///
/// Natural dimensions are decoded once at construction; the display size
/// lives on the owning edit's [`Rect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub natural_width: u32,
    pub natural_height: u32,
}

impl ImageData {
    /// Validate and decode an image payload.
    ///
    /// Rejects anything that is not a PNG or JPEG by content signature, and
    /// anything whose natural dimensions cannot be decoded.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, ModelError> {
        let format = ImageFormat::detect(&bytes).ok_or(ModelError::UnsupportedImage)?;

        let (natural_width, natural_height) = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|_| ModelError::UnsupportedImage)?
            .into_dimensions()
            .map_err(|_| ModelError::UnsupportedImage)?;

        if natural_width == 0 || natural_height == 0 {
            return Err(ModelError::UnsupportedImage);
        }

        Ok(Self { bytes, format, natural_width, natural_height })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.natural_width as f32 / self.natural_height as f32
    }
}

/// A text annotation placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEdit {
    pub id: EditId,
    #[serde(flatten)]
    pub rect: Rect,
    pub text: String,
    pub font_size: f32,
    pub font_family: String,
}

impl TextEdit {
    /// Create a new text edit at the given anchor with default content.
    pub fn at(anchor: Point) -> Self {
        Self {
            id: EditId::new(),
            rect: Rect::new(anchor.x, anchor.y, 100.0, 20.0),
            text: DEFAULT_TEXT.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
        }
    }
}

/// An image annotation placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEdit {
    pub id: EditId,
    #[serde(flatten)]
    pub rect: Rect,
    pub image: ImageData,
}

impl ImageEdit {
    /// Create a new image edit from a raw payload.
    ///
    /// Display width is fixed at [`DEFAULT_IMAGE_WIDTH`] with the height
    /// following the natural aspect ratio. Image edits always land at the
    /// fixed offset (50, 50); only text edits honor the click anchor.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ModelError> {
        let image = ImageData::decode(bytes)?;
        let width = DEFAULT_IMAGE_WIDTH;
        let height = width / image.aspect_ratio();

        Ok(Self { id: EditId::new(), rect: Rect::new(50.0, 50.0, width, height), image })
    }
}

/// One user-placed annotation.
///
/// Closed sum type with exhaustive matching at every consumer, so a new edit
/// kind is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Edit {
    Text(TextEdit),
    Image(ImageEdit),
}

impl Edit {
    pub fn id(&self) -> EditId {
        match self {
            Edit::Text(edit) => edit.id,
            Edit::Image(edit) => edit.id,
        }
    }

    pub fn rect(&self) -> Rect {
        match self {
            Edit::Text(edit) => edit.rect,
            Edit::Image(edit) => edit.rect,
        }
    }

    /// Copy with replaced geometry (the drag/resize contract).
    pub fn with_rect(&self, rect: Rect) -> Self {
        let mut edit = self.clone();
        match &mut edit {
            Edit::Text(text) => text.rect = rect,
            Edit::Image(image) => image.rect = rect,
        }
        edit
    }

    /// Copy with the patch's fields merged in.
    ///
    /// A patch can never change the edit's variant; text-only fields are
    /// ignored on image edits.
    pub fn with_patch(&self, patch: &EditPatch) -> Self {
        let mut edit = self.clone();
        match &mut edit {
            Edit::Text(text) => {
                patch.apply_rect(&mut text.rect);
                if let Some(content) = &patch.text {
                    text.text = content.clone();
                }
                if let Some(size) = patch.font_size {
                    text.font_size = size;
                }
                if let Some(family) = &patch.font_family {
                    text.font_family = family.clone();
                }
            }
            Edit::Image(image) => {
                patch.apply_rect(&mut image.rect);
            }
        }
        edit
    }
}

/// Partial update applied to an existing edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub text: Option<String>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
}

impl EditPatch {
    /// Patch that moves an edit to a new top-left position.
    pub fn move_to(x: f32, y: f32) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    /// Patch that replaces the full geometry.
    pub fn resize(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Self::default()
        }
    }

    fn apply_rect(&self, rect: &mut Rect) {
        if let Some(x) = self.x {
            rect.x = x;
        }
        if let Some(y) = self.y {
            rect.y = y;
        }
        if let Some(width) = self.width {
            rect.width = width;
        }
        if let Some(height) = self.height {
            rect.height = height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .expect("png encoding should succeed");
        out
    }

    #[test]
    fn text_edit_defaults_follow_the_placement_anchor() {
        let edit = TextEdit::at(Point::new(42.0, 17.0));

        assert_eq!(edit.text, DEFAULT_TEXT);
        assert_eq!(edit.font_size, 14.0);
        assert_eq!(edit.font_family, "Helvetica");
        assert_eq!(edit.rect, Rect::new(42.0, 17.0, 100.0, 20.0));
    }

    #[test]
    fn image_edit_preserves_aspect_ratio_at_fixed_offset() {
        let edit = ImageEdit::from_bytes(png_bytes(400, 200)).expect("valid png");

        assert_eq!(edit.rect.x, 50.0);
        assert_eq!(edit.rect.y, 50.0);
        assert_eq!(edit.rect.width, 200.0);
        assert_eq!(edit.rect.height, 100.0);
        assert_eq!(edit.image.format, ImageFormat::Png);
        assert_eq!(edit.image.natural_width, 400);
    }

    #[test]
    fn non_image_payload_is_rejected() {
        let err = ImageEdit::from_bytes(b"%PDF-1.7 not an image".to_vec())
            .expect_err("pdf bytes are not an image");
        assert!(matches!(err, ModelError::UnsupportedImage));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut bytes = png_bytes(4, 4);
        bytes.truncate(12);
        assert!(ImageData::decode(bytes).is_err());
    }

    #[test]
    fn format_detection_uses_content_signatures() {
        assert_eq!(ImageFormat::detect(&[0x89, b'P', b'N', b'G', 0x0D]), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(b"GIF89a"), None);
    }

    #[test]
    fn patch_merge_cannot_change_the_variant() {
        let image = Edit::Image(ImageEdit::from_bytes(png_bytes(2, 2)).expect("valid png"));
        let patch = EditPatch {
            text: Some("ignored".to_owned()),
            font_size: Some(99.0),
            x: Some(5.0),
            ..EditPatch::default()
        };

        let patched = image.with_patch(&patch);
        assert!(matches!(patched, Edit::Image(_)));
        assert_eq!(patched.rect().x, 5.0);
        assert_eq!(patched.id(), image.id());
    }

    #[test]
    fn patch_merges_text_fields() {
        let edit = Edit::Text(TextEdit::at(Point::new(0.0, 0.0)));
        let patched = edit.with_patch(&EditPatch {
            text: Some("hello".to_owned()),
            font_size: Some(22.0),
            ..EditPatch::default()
        });

        let Edit::Text(text) = patched else { panic!("variant must be preserved") };
        assert_eq!(text.text, "hello");
        assert_eq!(text.font_size, 22.0);
        assert_eq!(text.font_family, "Helvetica");
    }

    #[test]
    fn with_rect_replaces_geometry_and_keeps_id() {
        let edit = Edit::Text(TextEdit::at(Point::new(1.0, 2.0)));
        let moved = edit.with_rect(Rect::new(9.0, 8.0, 70.0, 30.0));

        assert_eq!(moved.id(), edit.id());
        assert_eq!(moved.rect(), Rect::new(9.0, 8.0, 70.0, 30.0));
    }

    #[test]
    fn edit_serializes_with_a_type_tag() {
        let edit = Edit::Text(TextEdit::at(Point::new(0.0, 0.0)));
        let value = serde_json::to_value(&edit).expect("serializable");

        assert_eq!(value["type"], "text");
        assert_eq!(value["text"], DEFAULT_TEXT);
    }
}
