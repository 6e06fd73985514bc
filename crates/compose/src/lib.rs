//! Export composition for annotated documents.
//!
//! Takes source PDF bytes, a [`PageEditMap`](pdf_annotator_model::PageEditMap)
//! and a [`PageOrder`](pdf_annotator_model::PageOrder) and produces a new
//! standalone PDF with the edits flattened in. The source is read-only
//! throughout.

pub mod compositor;
pub mod coords;
pub mod error;
pub mod writer;

pub use compositor::compose;
pub use error::ExportError;
pub use writer::DocumentWriter;
