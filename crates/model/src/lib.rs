//! Edit-state model for the PDF annotator.
//!
//! The versioned, per-page collection of annotation edits, the undo/redo
//! history over that collection, and the session state that ties them to a
//! loaded document. Rendering and PDF writing live in their own crates;
//! this one owns the invariants: history consistency, id stability, and
//! immutable snapshot replacement.

pub mod edit;
pub mod error;
pub mod history;
pub mod page_edits;
pub mod page_order;
pub mod session;

pub use edit::{
    Edit, EditId, EditPatch, ImageData, ImageEdit, ImageFormat, Point, Rect, TextEdit,
};
pub use error::ModelError;
pub use history::History;
pub use page_edits::PageEditMap;
pub use page_order::PageOrder;
pub use session::{ensure_pdf, is_pdf, EditorAction, EditorSession, DEFAULT_ZOOM};
