//! Editor configuration
//!
//! Geometry of the on-screen viewer, blank page size and session limits.
//! Every field has a default so a partial JSON object is a valid config.

use crate::coords::ViewerGeometry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Zoom the viewer renders pages at when overlays are placed
    pub viewer_scale: f64,
    /// Page width (points) the viewer lays pages out against at scale 1.0
    pub reference_page_width: f64,
    /// Page height (points) the viewer lays pages out against at scale 1.0
    pub reference_page_height: f64,
    /// Size of pages inserted by "add blank page" (A4)
    pub blank_page_width: f64,
    pub blank_page_height: f64,
    /// Upper bound for a single "add multiple pages" request
    pub max_bulk_pages: u32,
    /// Maximum number of snapshots kept; `None` keeps everything
    pub history_limit: Option<usize>,
    pub default_signature_font_size: f64,
    pub default_page_number_font_size: f64,
    /// Appended to the document stem when exporting a download
    pub download_suffix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            viewer_scale: 1.2,
            reference_page_width: 595.0,
            reference_page_height: 842.0,
            blank_page_width: 595.28,
            blank_page_height: 841.89,
            max_bulk_pages: 50,
            history_limit: Some(100),
            default_signature_font_size: 32.0,
            default_page_number_font_size: 12.0,
            download_suffix: "_edited".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn viewer_geometry(&self) -> ViewerGeometry {
        ViewerGeometry {
            scale: self.viewer_scale,
            reference_width: self.reference_page_width,
            reference_height: self.reference_page_height,
            default_signature_font_size: self.default_signature_font_size,
            default_page_number_font_size: self.default_page_number_font_size,
        }
    }

    /// File name offered for a downloaded export: `contract.pdf` -> `contract_edited.pdf`
    pub fn download_name(&self, document_name: &str) -> String {
        let stem = document_name
            .strip_suffix(".pdf")
            .or_else(|| document_name.strip_suffix(".PDF"))
            .unwrap_or(document_name);
        format!("{}{}.pdf", stem, self.download_suffix)
    }
}
