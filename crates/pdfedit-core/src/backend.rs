//! Seams to the outside world: the PDF manipulation service and the
//! user-facing notification sink.

use crate::coords::ViewerGeometry;
use crate::elements::Overlays;
use crate::error::PdfServiceError;
use serde::Serialize;

/// Width and height of a page in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Byte-level PDF operations. Every mutating call takes the current bytes
/// and returns a fresh buffer; inputs are never modified.
pub trait PdfBackend {
    fn page_count(&self, bytes: &[u8]) -> Result<u32, PdfServiceError>;

    /// Size of a 1-based page
    fn page_size(&self, bytes: &[u8], page: u32) -> Result<PageSize, PdfServiceError>;

    /// Insert `count` blank pages so the first one becomes page `after + 1`
    fn insert_blank_pages(
        &self,
        bytes: &[u8],
        after: u32,
        count: u32,
        size: PageSize,
    ) -> Result<Vec<u8>, PdfServiceError>;

    /// Remove the given 1-based pages
    fn remove_pages(&self, bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfServiceError>;

    /// Move page `from` so it ends up at index `to`
    fn move_page(&self, bytes: &[u8], from: u32, to: u32) -> Result<Vec<u8>, PdfServiceError>;

    /// Copy every page of `source` in after page `after`.
    /// Returns the new bytes and the number of pages inserted.
    fn import_pages(
        &self,
        bytes: &[u8],
        source: &[u8],
        after: u32,
    ) -> Result<(Vec<u8>, u32), PdfServiceError>;

    /// Draw every overlay permanently into the page content
    fn flatten(
        &self,
        bytes: &[u8],
        overlays: &Overlays,
        total_pages: u32,
        geometry: &ViewerGeometry,
    ) -> Result<Vec<u8>, PdfServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Error => "error",
        }
    }
}

/// Fire-and-forget message sink shown to the user (toasts)
pub trait Notifier {
    fn notify(&self, message: &str, severity: Severity);
}

/// Notifier that only writes to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::warn!(severity = severity.as_str(), "{}", message),
            _ => tracing::info!(severity = severity.as_str(), "{}", message),
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, message: &str, severity: Severity) {
        (**self).notify(message, severity)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, message: &str, severity: Severity) {
        (**self).notify(message, severity)
    }
}
