//! WASM bindings for the PDF annotation editor
//!
//! All editing state lives in Rust inside a `PdfEditor`. JavaScript renders
//! pages, handles DOM events and file I/O, and passes elements in and out as
//! JSON.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfEditor } from './pkg/pdfedit_wasm.js';
//!
//! await init();
//!
//! const editor = new PdfEditor();
//! editor.setNotifyCallback((message, severity) => showToast(message, severity));
//! editor.loadDocument("lease.pdf", bytes);
//! const id = editor.addElement(
//!     JSON.stringify({ type: "PageNumber", template: "Page {page} of {total}" }),
//!     0, 300, 980, 0, 0,
//! );
//! editor.deletePage(2);
//! editor.undo();
//! downloadBlob(editor.exportDocument(), editor.downloadFileName());
//! ```

pub mod editor;
pub mod notifier;

use wasm_bindgen::prelude::*;

pub use editor::PdfEditor;
pub use notifier::JsNotifier;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get page count from PDF bytes (convenience function)
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfedit_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}
