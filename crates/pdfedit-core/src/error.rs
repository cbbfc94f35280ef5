use thiserror::Error;

/// Failures raised by a [`crate::backend::PdfBackend`] while touching PDF bytes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfServiceError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Image could not be embedded: {0}")]
    ImageError(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedImage(String),
}

/// Errors surfaced by the editor session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("No document loaded")]
    NoDocumentLoaded,

    #[error("Cannot delete the only remaining page")]
    LastPage,

    #[error("Page {page} is out of range (1-{total})")]
    InvalidPageIndex { page: u32, total: u32 },

    #[error(transparent)]
    PdfService(#[from] PdfServiceError),

    #[error("Page count {count} must be between 1 and {max}")]
    ImportMismatch { count: u32, max: u32 },

    #[error("Invalid element: {0}")]
    InvalidElement(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),
}
