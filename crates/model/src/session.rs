//! Editor session state and actions.
//!
//! One session per loaded document: the undo history, the page order, the
//! UI selection, and the export-in-flight guard. Every state change goes
//! through [`EditorSession::apply`], which replaces the current snapshot
//! wholesale; the current snapshot itself is never mutated.

use crate::edit::{Edit, EditId, EditPatch, ImageEdit, Point, TextEdit};
use crate::error::ModelError;
use crate::history::History;
use crate::page_edits::PageEditMap;
use crate::page_order::PageOrder;

/// Initial viewer zoom factor.
pub const DEFAULT_ZOOM: f32 = 1.5;

const MIN_ZOOM: f32 = 0.25;
const MAX_ZOOM: f32 = 4.0;

/// True when the payload carries the PDF magic header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Reject a non-PDF payload before any session state exists.
pub fn ensure_pdf(bytes: &[u8]) -> Result<(), ModelError> {
    if is_pdf(bytes) {
        Ok(())
    } else {
        Err(ModelError::NotAPdf)
    }
}

/// A state-changing user action.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    AddEdit { page: u32, edit: Edit },
    UpdateEdit { page: u32, edit_id: EditId, patch: EditPatch },
    RemoveEdit { page: u32, edit_id: EditId },
    Undo,
    Redo,
    ReorderPages { from: usize, to: usize },
    Select { edit_id: Option<EditId> },
    SetCurrentPage { page: u32 },
    SetZoom { zoom: f32 },
}

/// Editing state for one loaded document.
#[derive(Debug, Clone)]
pub struct EditorSession {
    name: String,
    page_count: u32,
    page_order: PageOrder,
    history: History,
    selection: Option<EditId>,
    current_page: u32,
    zoom: f32,
    export_pending: bool,
}

impl EditorSession {
    pub fn new(name: impl Into<String>, page_count: u32) -> Self {
        Self {
            name: name.into(),
            page_count,
            page_order: PageOrder::for_page_count(page_count),
            history: History::new(),
            selection: None,
            current_page: 1,
            zoom: DEFAULT_ZOOM,
            export_pending: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn page_order(&self) -> &PageOrder {
        &self.page_order
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The edits as of the history cursor.
    pub fn current(&self) -> &PageEditMap {
        self.history.current()
    }

    pub fn selection(&self) -> Option<EditId> {
        self.selection
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// File name for the exported document.
    pub fn export_name(&self) -> String {
        format!("edited-{}", self.name)
    }

    /// Place a new default text edit at the click anchor.
    pub fn add_text_at(&mut self, page: u32, anchor: Point) -> EditId {
        let edit = Edit::Text(TextEdit::at(anchor));
        let id = edit.id();
        self.apply(EditorAction::AddEdit { page, edit });
        id
    }

    /// Insert an image onto the currently viewed page.
    pub fn add_image(&mut self, bytes: Vec<u8>) -> Result<EditId, ModelError> {
        let edit = Edit::Image(ImageEdit::from_bytes(bytes)?);
        let id = edit.id();
        self.apply(EditorAction::AddEdit { page: self.current_page, edit });
        Ok(id)
    }

    /// Apply one action atomically.
    pub fn apply(&mut self, action: EditorAction) {
        match action {
            EditorAction::AddEdit { page, edit } => {
                let id = edit.id();
                self.history.push(self.current().with_added(page, edit));
                self.selection = Some(id);
            }
            EditorAction::UpdateEdit { page, edit_id, patch } => {
                // An ineffective patch yields an equal map; push drops it.
                self.history.push(self.current().with_updated(page, edit_id, &patch));
            }
            EditorAction::RemoveEdit { page, edit_id } => {
                self.history.push(self.current().with_removed(page, edit_id));
                if self.selection == Some(edit_id) {
                    self.selection = None;
                }
            }
            EditorAction::Undo => {
                if self.history.can_undo() {
                    self.history.undo();
                    self.selection = None;
                }
            }
            EditorAction::Redo => {
                if self.history.can_redo() {
                    self.history.redo();
                    self.selection = None;
                }
            }
            EditorAction::ReorderPages { from, to } => {
                self.page_order.reorder(from, to);
            }
            EditorAction::Select { edit_id } => {
                self.selection = edit_id;
            }
            EditorAction::SetCurrentPage { page } => {
                self.current_page = page.max(1).min(self.page_count.max(1));
            }
            EditorAction::SetZoom { zoom } => {
                self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            }
        }
    }

    /// Mark an export as in flight.
    ///
    /// Fails while a previous export has not settled; the trigger stays
    /// disabled until [`EditorSession::finish_export`].
    pub fn begin_export(&mut self) -> Result<(), ModelError> {
        if self.export_pending {
            return Err(ModelError::ExportInFlight);
        }
        self.export_pending = true;
        Ok(())
    }

    /// Restore the idle state after an export settles, success or failure.
    pub fn finish_export(&mut self) {
        self.export_pending = false;
    }

    pub fn export_pending(&self) -> bool {
        self.export_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> EditorSession {
        EditorSession::new("report.pdf", 3)
    }

    #[test]
    fn pdf_magic_gate() {
        assert!(is_pdf(b"%PDF-1.4\n"));
        assert!(!is_pdf(b"PK\x03\x04"));
        assert!(!is_pdf(b""));
        assert!(matches!(ensure_pdf(b"PK\x03\x04"), Err(ModelError::NotAPdf)));
    }

    #[test]
    fn adding_an_edit_selects_it_and_grows_history() {
        let mut session = session();
        let id = session.add_text_at(1, Point::new(50.0, 50.0));

        assert_eq!(session.selection(), Some(id));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.current().edits_on(1).len(), 1);
    }

    #[test]
    fn undo_and_redo_clear_the_selection() {
        let mut session = session();
        session.add_text_at(1, Point::new(0.0, 0.0));
        assert!(session.selection().is_some());

        session.apply(EditorAction::Undo);
        assert_eq!(session.selection(), None);
        assert!(session.current().is_empty());

        session.apply(EditorAction::Select { edit_id: None });
        session.apply(EditorAction::Redo);
        assert_eq!(session.selection(), None);
        assert_eq!(session.current().edits_on(1).len(), 1);
    }

    #[test]
    fn undo_when_nothing_to_undo_changes_nothing() {
        let mut session = session();
        session.apply(EditorAction::Undo);

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().cursor(), 0);
    }

    #[test]
    fn ineffective_update_leaves_history_untouched() {
        let mut session = session();
        let id = session.add_text_at(1, Point::new(5.0, 5.0));
        let len = session.history().len();

        session.apply(EditorAction::UpdateEdit {
            page: 1,
            edit_id: id,
            patch: EditPatch::default(),
        });
        assert_eq!(session.history().len(), len);

        session.apply(EditorAction::UpdateEdit {
            page: 1,
            edit_id: id,
            patch: EditPatch::move_to(80.0, 90.0),
        });
        assert_eq!(session.history().len(), len + 1);
    }

    #[test]
    fn images_are_inserted_on_the_currently_viewed_page() {
        let mut png = Vec::new();
        image::RgbImage::from_pixel(4, 2, image::Rgb([0, 0, 0]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("png encoding should succeed");

        let mut session = session();
        session.apply(EditorAction::SetCurrentPage { page: 2 });
        let id = session.add_image(png).expect("valid png");

        assert_eq!(session.selection(), Some(id));
        assert_eq!(session.current().edits_on(2).len(), 1);

        let err = session.add_image(b"GIF89a".to_vec()).expect_err("gif is rejected");
        assert!(matches!(err, ModelError::UnsupportedImage));
    }

    #[test]
    fn removing_the_selected_edit_clears_the_selection() {
        let mut session = session();
        let id = session.add_text_at(2, Point::new(1.0, 1.0));

        session.apply(EditorAction::RemoveEdit { page: 2, edit_id: id });
        assert_eq!(session.selection(), None);
        assert!(session.current().is_empty());
    }

    #[test]
    fn reordering_pages_never_touches_the_history() {
        let mut session = session();
        session.add_text_at(1, Point::new(0.0, 0.0));
        let len = session.history().len();

        session.apply(EditorAction::ReorderPages { from: 0, to: 2 });
        assert_eq!(session.page_order().pages(), &[2, 3, 1]);
        assert_eq!(session.history().len(), len);
    }

    #[test]
    fn a_new_action_after_undo_discards_redo() {
        let mut session = session();
        session.add_text_at(1, Point::new(0.0, 0.0));
        session.add_text_at(1, Point::new(10.0, 10.0));
        session.apply(EditorAction::Undo);
        assert!(session.can_redo());

        session.add_text_at(2, Point::new(0.0, 0.0));
        assert!(!session.can_redo());
    }

    #[test]
    fn export_guard_rejects_overlapping_exports() {
        let mut session = session();
        session.begin_export().expect("first export may start");
        assert!(session.export_pending());

        let err = session.begin_export().expect_err("second export must wait");
        assert!(matches!(err, ModelError::ExportInFlight));

        session.finish_export();
        session.begin_export().expect("export may start again after settling");
    }

    #[test]
    fn current_page_and_zoom_are_clamped() {
        let mut session = session();
        session.apply(EditorAction::SetCurrentPage { page: 99 });
        assert_eq!(session.current_page(), 3);
        session.apply(EditorAction::SetCurrentPage { page: 0 });
        assert_eq!(session.current_page(), 1);

        session.apply(EditorAction::SetZoom { zoom: 100.0 });
        assert_eq!(session.zoom(), MAX_ZOOM);
        session.apply(EditorAction::SetZoom { zoom: 0.0 });
        assert_eq!(session.zoom(), MIN_ZOOM);
    }

    #[test]
    fn export_name_prefixes_the_original() {
        assert_eq!(session().export_name(), "edited-report.pdf");
    }
}
