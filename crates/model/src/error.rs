use thiserror::Error;

/// Errors raised by the edit-state model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Payload is not a decodable PNG or JPEG image.
    #[error("image payload is not a decodable PNG or JPEG")]
    UnsupportedImage,

    /// Payload does not carry the PDF magic header.
    #[error("file is not a PDF document")]
    NotAPdf,

    /// A second export was requested while one is still pending.
    #[error("an export is already in progress")]
    ExportInFlight,
}
