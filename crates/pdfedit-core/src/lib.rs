//! Editing core for the browser PDF annotator
//!
//! Signatures, images and page numbers are kept as overlays on top of an
//! unmodified PDF while the user works. Structural page edits (insert,
//! delete, reorder, import) rewrite the bytes through a [`PdfBackend`] and
//! renumber the overlays to follow their pages. Saving flattens the
//! overlays into the page content.
//!
//! [`DocumentEditor`] is the entry point; [`LopdfBackend`] is the lopdf
//! implementation of the byte-level operations.

pub mod backend;
pub mod config;
pub mod coords;
pub mod elements;
pub mod error;
pub mod history;
pub mod lopdf_backend;
pub mod renumber;
pub mod session;

mod flatten;
mod images;
mod page_tree;

pub use backend::{Notifier, PageSize, PdfBackend, Severity, TracingNotifier};
pub use config::EditorConfig;
pub use coords::{PdfBox, ViewerGeometry};
pub use elements::{
    Alignment, ElementPayload, ImageOverlay, OverlayElement, Overlays, PageNumber, Position,
    Signature, SignatureContent, Size, TextStyle, ALL_PAGES,
};
pub use error::{EditorError, PdfServiceError};
pub use history::History;
pub use lopdf_backend::LopdfBackend;
pub use renumber::PageEdit;
pub use session::{DocumentEditor, PdfDocument, SaveOutcome, SaveTarget, Snapshot};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfServiceError> {
    LopdfBackend::new().page_count(bytes)
}
