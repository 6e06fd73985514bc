use thiserror::Error;

/// Errors raised while composing the exported document.
///
/// All of them are terminal for the export: the attempt aborts with no
/// partial output, the source bytes and the edit state stay untouched, and
/// a retry is an explicit new export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The source bytes could not be read as a PDF document.
    #[error("failed to load source document: {0}")]
    Load(#[source] lopdf::Error),

    /// The source document has no pages, or its page tree is malformed.
    #[error("source document structure is invalid: {0}")]
    Structure(String),

    /// A page named by the export order does not exist in the source.
    #[error("page {0} missing from the source document")]
    MissingPage(u32),

    /// An image edit's payload could not be decoded for embedding.
    #[error("image payload could not be embedded")]
    UnsupportedImage,

    /// Writing or serializing the output document failed.
    #[error("PDF write error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Pdf(err.into())
    }
}
