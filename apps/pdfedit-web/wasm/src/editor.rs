//! WASM-exposed editing session
//!
//! Thin wrapper around `pdfedit_core::DocumentEditor`. Elements cross the
//! boundary as JSON strings; errors become `JsValue` strings after the
//! notifier has already shown them.

use crate::notifier::JsNotifier;
use pdfedit_core::{
    DocumentEditor, EditorConfig, EditorError, ElementPayload, LopdfBackend, OverlayElement,
    Position, SaveOutcome, SaveTarget, Size,
};
use wasm_bindgen::prelude::*;

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_uint8_array(bytes: &[u8]) -> js_sys::Uint8Array {
    let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
    array.copy_from(bytes);
    array
}

/// Editing session for one PDF at a time
#[wasm_bindgen]
pub struct PdfEditor {
    inner: DocumentEditor<LopdfBackend, JsNotifier>,
}

impl Default for PdfEditor {
    fn default() -> Self {
        Self::new()
    }
}

// Internal methods, testable without JsValue
impl PdfEditor {
    fn from_config_json(json: &str) -> Result<PdfEditor, String> {
        let config =
            EditorConfig::from_json(json).map_err(|e| format!("Invalid config JSON: {}", e))?;
        Ok(PdfEditor {
            inner: DocumentEditor::with_config(LopdfBackend::new(), JsNotifier::new(), config),
        })
    }

    fn add_element_internal(
        &mut self,
        payload_json: &str,
        page: u32,
        position: Position,
        size: Size,
    ) -> Result<String, String> {
        let payload: ElementPayload = serde_json::from_str(payload_json)
            .map_err(|e| format!("Invalid element JSON: {}", e))?;
        self.inner
            .add_element(payload, page, position, size)
            .map_err(|e| e.to_string())
    }

    fn update_element_internal(&mut self, element_json: &str) -> Result<(), String> {
        let element: OverlayElement = serde_json::from_str(element_json)
            .map_err(|e| format!("Invalid element JSON: {}", e))?;
        self.inner.update_element(element).map_err(|e| e.to_string())
    }

    fn element_json(&self, id: &str) -> Option<String> {
        self.inner
            .element(id)
            .and_then(|element| serde_json::to_string(&element).ok())
    }

    fn elements_on_page_json(&self, page: u32) -> Result<String, String> {
        let elements = self.inner.elements_on_page(page).map_err(|e| e.to_string())?;
        serde_json::to_string(&elements).map_err(|e| e.to_string())
    }

    fn overlays_json(&self) -> Result<String, String> {
        let overlays = self
            .inner
            .overlays()
            .ok_or_else(|| EditorError::NoDocumentLoaded.to_string())?;
        overlays.to_json().map_err(|e| e.to_string())
    }

    fn export_internal(&mut self) -> Result<Vec<u8>, EditorError> {
        match self.inner.save_document(SaveTarget::Download)? {
            SaveOutcome::Download { bytes, .. } => Ok(bytes),
            SaveOutcome::InPlace { .. } => Ok(self
                .inner
                .document_bytes()
                .map(|bytes| bytes.to_vec())
                .unwrap_or_default()),
        }
    }
}

#[wasm_bindgen]
impl PdfEditor {
    /// Create an editor with the default configuration
    #[wasm_bindgen(constructor)]
    pub fn new() -> PdfEditor {
        PdfEditor {
            inner: DocumentEditor::new(LopdfBackend::new(), JsNotifier::new()),
        }
    }

    /// Create an editor from a (partial) JSON configuration
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<PdfEditor, JsValue> {
        Self::from_config_json(config_json).map_err(|e| JsValue::from_str(&e))
    }

    /// Set the toast callback: `(message: string, severity: string) => void`
    #[wasm_bindgen(js_name = setNotifyCallback)]
    pub fn set_notify_callback(&mut self, callback: js_sys::Function) {
        self.inner.notifier().set_callback(callback);
    }

    // ============ Document ============

    #[wasm_bindgen(js_name = loadDocument)]
    pub fn load_document(&mut self, name: &str, bytes: &[u8]) -> Result<(), JsValue> {
        self.inner.load_document(name, bytes).map_err(to_js)
    }

    /// Drop the document, its overlays and history
    #[wasm_bindgen(js_name = closeDocument)]
    pub fn close_document(&mut self) {
        self.inner.close_document();
    }

    #[wasm_bindgen(getter, js_name = hasDocument)]
    pub fn has_document(&self) -> bool {
        self.inner.has_document()
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> Option<String> {
        self.inner.document_name().map(str::to_string)
    }

    /// Current document bytes for rendering
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> Option<js_sys::Uint8Array> {
        self.inner
            .document_bytes()
            .map(|bytes| to_uint8_array(&bytes))
    }

    /// Flatten all overlays into the document itself (undoable)
    #[wasm_bindgen(js_name = saveDocument)]
    pub fn save_document(&mut self) -> Result<u32, JsValue> {
        match self.inner.save_document(SaveTarget::InPlace).map_err(to_js)? {
            SaveOutcome::InPlace { total_pages } => Ok(total_pages),
            SaveOutcome::Download { .. } => Ok(self.inner.total_pages()),
        }
    }

    /// Flattened copy of the document for download; the session is unchanged
    #[wasm_bindgen(js_name = exportDocument)]
    pub fn export_document(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self.export_internal().map_err(to_js)?;
        tracing::debug!(len = bytes.len(), "Handing exported document to JS");
        Ok(to_uint8_array(&bytes))
    }

    /// File name to offer for `exportDocument`
    #[wasm_bindgen(js_name = downloadFileName)]
    pub fn download_file_name(&self) -> Option<String> {
        self.inner
            .document_name()
            .map(|name| self.inner.config().download_name(name))
    }

    // ============ Pages ============

    #[wasm_bindgen(getter, js_name = totalPages)]
    pub fn total_pages(&self) -> u32 {
        self.inner.total_pages()
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.inner.current_page()
    }

    #[wasm_bindgen(js_name = setCurrentPage)]
    pub fn set_current_page(&mut self, page: u32) -> Result<(), JsValue> {
        self.inner.set_current_page(page).map_err(to_js)
    }

    /// Called by the viewer once it knows the real page count
    #[wasm_bindgen(js_name = syncPageCount)]
    pub fn sync_page_count(&mut self, count: u32) -> Result<(), JsValue> {
        self.inner.sync_page_count(count).map_err(to_js)
    }

    /// `{ width, height }` of a page in PDF points
    #[wasm_bindgen(js_name = pageSize)]
    pub fn page_size(&self, page: u32) -> Result<JsValue, JsValue> {
        let size = self.inner.page_size(page).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&size)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = addPage)]
    pub fn add_page(&mut self, after: u32) -> Result<(), JsValue> {
        self.inner.add_page(after).map_err(to_js)
    }

    #[wasm_bindgen(js_name = addPages)]
    pub fn add_pages(&mut self, after: u32, count: u32) -> Result<(), JsValue> {
        self.inner.add_pages(after, count).map_err(to_js)
    }

    /// Import every page of another PDF; returns the number imported
    #[wasm_bindgen(js_name = addPagesFromPdf)]
    pub fn add_pages_from_pdf(&mut self, bytes: &[u8], after: u32) -> Result<u32, JsValue> {
        self.inner.add_pages_from_pdf(bytes, after).map_err(to_js)
    }

    #[wasm_bindgen(js_name = deletePage)]
    pub fn delete_page(&mut self, page: u32) -> Result<(), JsValue> {
        self.inner.delete_page(page).map_err(to_js)
    }

    #[wasm_bindgen(js_name = deletePages)]
    pub fn delete_pages(&mut self, pages: &[u32]) -> Result<(), JsValue> {
        self.inner.delete_pages(pages).map_err(to_js)
    }

    #[wasm_bindgen(js_name = reorderPages)]
    pub fn reorder_pages(&mut self, from: u32, to: u32) -> Result<(), JsValue> {
        self.inner.reorder_pages(from, to).map_err(to_js)
    }

    // ============ Elements ============

    /// Add an element described by `payload_json`; returns its id.
    /// Page 0 places a page number on every page.
    #[wasm_bindgen(js_name = addElement)]
    pub fn add_element(
        &mut self,
        payload_json: &str,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<String, JsValue> {
        self.add_element_internal(
            payload_json,
            page,
            Position { x, y },
            Size { width, height },
        )
        .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = removeElement)]
    pub fn remove_element(&mut self, id: &str) -> Result<(), JsValue> {
        self.inner.remove_element(id).map(|_| ()).map_err(to_js)
    }

    /// Replace an element with the JSON produced by `getElement`
    #[wasm_bindgen(js_name = updateElement)]
    pub fn update_element(&mut self, element_json: &str) -> Result<(), JsValue> {
        self.update_element_internal(element_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = moveElement)]
    pub fn move_element(&mut self, id: &str, x: f64, y: f64) -> Result<(), JsValue> {
        self.inner
            .move_element(id, Position { x, y })
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = resizeElement)]
    pub fn resize_element(&mut self, id: &str, width: f64, height: f64) -> Result<(), JsValue> {
        self.inner
            .resize_element(id, Size { width, height })
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = getElement)]
    pub fn get_element(&self, id: &str) -> Option<String> {
        self.element_json(id)
    }

    /// JSON array of the elements drawn on `page`
    #[wasm_bindgen(js_name = elementsOnPage)]
    pub fn elements_on_page(&self, page: u32) -> Result<String, JsValue> {
        self.elements_on_page_json(page)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// All overlays as `{ signatures, images, page_numbers }` JSON
    #[wasm_bindgen(js_name = getOverlays)]
    pub fn get_overlays(&self) -> Result<String, JsValue> {
        self.overlays_json().map_err(|e| JsValue::from_str(&e))
    }

    // ============ History ============

    /// Returns false if there was nothing to undo
    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.inner.undo().map_err(to_js)
    }

    /// Returns false if there was nothing to redo
    pub fn redo(&mut self) -> Result<bool, JsValue> {
        self.inner.redo().map_err(to_js)
    }

    #[wasm_bindgen(getter, js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(getter, js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }
}


#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_export_without_document_fails() {
        let mut editor = PdfEditor::new();
        assert!(editor.get_document_bytes().is_none());
        assert!(editor.export_document().is_err());
    }

    #[wasm_bindgen_test]
    fn test_export_returns_uint8_array() {
        let mut editor = PdfEditor::new();
        editor
            .inner
            .load_document("deed.pdf", tests_pdf())
            .unwrap();
        let array = editor.export_document().unwrap();
        assert!(array.length() > 0);
        assert_eq!(
            pdfedit_core::get_page_count(&array.to_vec()).unwrap(),
            1
        );
    }

    fn tests_pdf() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
