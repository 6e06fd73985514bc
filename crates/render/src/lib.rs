//! Viewer-side rendering service boundary.
//!
//! The annotator consumes a rendering service: give it raw PDF bytes, get
//! back a page count and, per page, a rasterizable surface at a given scale.
//! The default backend parses page geometry with lopdf and produces a
//! placeholder surface; real rasterization is supplied by an external
//! renderer behind the same trait.

use std::collections::HashMap;

use image::{ImageBuffer, Rgba};
use lopdf::{Document, Object};

pub type RgbaSurface = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Opaque handle for an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Native page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Target pixel size for thumbnail rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailTarget {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for ThumbnailTarget {
    fn default() -> Self {
        Self { width_px: 256, height_px: 256 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("unknown document handle {0}")]
    InvalidHandle(u64),
    #[error("page index {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    Encrypted,
    #[error("document has no pages")]
    NoPages,
}

/// The rendering service consumed by the viewer.
///
/// Page indices are 0-based. Callers must re-invoke [`render_page`] whenever
/// the scale changes.
///
/// [`render_page`]: RenderService::render_page
pub trait RenderService {
    fn open(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, RenderError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RenderError>;
    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, RenderError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        scale: f32,
    ) -> Result<RgbaSurface, RenderError>;
    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target: ThumbnailTarget,
    ) -> Result<RgbaSurface, RenderError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), RenderError>;
}

struct OpenDocument {
    page_sizes: Vec<PageSize>,
}

/// Default lopdf-backed renderer.
#[derive(Default)]
pub struct LopdfRenderer {
    next_handle: u64,
    documents: HashMap<DocumentHandle, OpenDocument>,
}

impl LopdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn document(&self, handle: DocumentHandle) -> Result<&OpenDocument, RenderError> {
        self.documents.get(&handle).ok_or(RenderError::InvalidHandle(handle.raw()))
    }

    fn parse_page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, RenderError> {
        let doc = Document::load_mem(bytes)?;

        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(RenderError::Encrypted);
        }

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(RenderError::NoPages);
        }

        let mut sizes = Vec::with_capacity(pages.len());
        for (_, page_id) in pages {
            sizes.push(page_size_from_media_box(&doc, page_id).unwrap_or(PageSize {
                width_pt: 612.0,
                height_pt: 792.0,
            }));
        }

        Ok(sizes)
    }
}

/// Resolve a page's MediaBox, walking Parent inheritance.
fn page_size_from_media_box(doc: &Document, page_id: lopdf::ObjectId) -> Option<PageSize> {
    let mut current = Some(page_id);
    // Depth limit guards against malformed Parent cycles.
    for _ in 0..16 {
        let id = current?;
        let dict = doc.get_object(id).ok()?.as_dict().ok()?;

        if let Ok(raw) = dict.get(b"MediaBox") {
            let resolved = match raw {
                Object::Reference(reference) => doc.get_object(*reference).ok()?,
                other => other,
            };
            let array = resolved.as_array().ok()?;
            if array.len() == 4 {
                let x0 = array[0].as_float().ok()?;
                let y0 = array[1].as_float().ok()?;
                let x1 = array[2].as_float().ok()?;
                let y1 = array[3].as_float().ok()?;
                return Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() });
            }
            return None;
        }

        current = dict.get(b"Parent").ok().and_then(|parent| parent.as_reference().ok());
    }
    None
}

impl RenderService for LopdfRenderer {
    fn open(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, RenderError> {
        let page_sizes = Self::parse_page_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = page_sizes.len(), "opened document");
        self.documents.insert(handle, OpenDocument { page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RenderError> {
        Ok(self.document(handle)?.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, RenderError> {
        let document = self.document(handle)?;
        document.page_sizes.get(page_index as usize).copied().ok_or(
            RenderError::PageOutOfRange {
                page: page_index,
                page_count: document.page_sizes.len() as u32,
            },
        )
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        scale: f32,
    ) -> Result<RgbaSurface, RenderError> {
        let size = self.page_size(handle, page_index)?;
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let width = (size.width_pt * scale).round().max(1.0) as u32;
        let height = (size.height_pt * scale).round().max(1.0) as u32;

        // Placeholder surface: white sheet with a hairline frame.
        let mut surface = RgbaSurface::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let frame = Rgba([214, 214, 214, 255]);
        if width >= 2 && height >= 2 {
            for x in 0..width {
                surface.put_pixel(x, 0, frame);
                surface.put_pixel(x, height - 1, frame);
            }
            for y in 0..height {
                surface.put_pixel(0, y, frame);
                surface.put_pixel(width - 1, y, frame);
            }
        }

        Ok(surface)
    }

    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target: ThumbnailTarget,
    ) -> Result<RgbaSurface, RenderError> {
        let page = self.render_page(handle, page_index, 0.25)?;
        Ok(image::imageops::thumbnail(&page, target.width_px.max(1), target.height_px.max(1)))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), RenderError> {
        tracing::debug!(handle = handle.raw(), "closed document");
        self.documents
            .remove(&handle)
            .map(|_| ())
            .ok_or(RenderError::InvalidHandle(handle.raw()))
    }
}
