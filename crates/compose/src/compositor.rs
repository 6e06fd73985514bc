//! Flattens an edit map onto a source document.
//!
//! The whole export is all-or-nothing. The first failure aborts the
//! composition and nothing is emitted; the caller keeps its source bytes
//! and edit state untouched.

use pdf_annotator_model::{Edit, PageEditMap, PageOrder};
use tracing::{debug, warn};

use crate::coords;
use crate::error::ExportError;
use crate::writer::DocumentWriter;

/// Compose the source document, its edits and its page order into a new
/// PDF.
///
/// Pages land in `order`'s sequence. Edits keyed to a page number absent
/// from `order` are skipped. Viewer coordinates (top-down, y grows
/// downward) are mapped onto PDF page space (bottom-up) per edit.
pub fn compose(
    source_bytes: &[u8],
    edits: &PageEditMap,
    order: &PageOrder,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = DocumentWriter::from_source(source_bytes, order.pages())?;
    debug!(pages = writer.page_count(), edits = edits.len(), "composing export");

    for (page_number, page_edits) in edits.iter() {
        let Some(page_index) = order.position_of(page_number) else {
            warn!(page = page_number, "edits reference a page outside the export order");
            continue;
        };
        let page_height = writer.page_height(page_index)?;

        for edit in page_edits {
            match edit {
                Edit::Text(text) => {
                    let baseline =
                        coords::text_baseline_y(page_height, text.rect.y, text.font_size);
                    writer.draw_text(
                        page_index,
                        &text.text,
                        text.rect.x,
                        baseline,
                        text.font_size,
                    )?;
                }
                Edit::Image(image) => {
                    let image_id = writer.embed_image(&image.image)?;
                    let origin =
                        coords::image_origin_y(page_height, image.rect.y, image.rect.height);
                    writer.draw_image(
                        page_index,
                        image_id,
                        image.rect.x,
                        origin,
                        image.rect.width,
                        image.rect.height,
                    )?;
                }
            }
        }
    }

    writer.save()
}
