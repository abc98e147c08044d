//! WASM bindings for the PDF annotator
//!
//! All editing state lives in Rust. JavaScript renders pages, forwards
//! pointer positions and rendered preview sizes, and triggers the download.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { EditorSession } from './pkg/annotator_wasm.js';
//!
//! await init();
//!
//! const session = new EditorSession("file.pdf", bytes);
//! session.setPreviewSize(0, canvas.clientWidth, canvas.clientHeight);
//! const id = session.addText(event.offsetX, event.offsetY);
//! session.updateText(id, "Approved");
//! session.commit([id]);
//! const blob = session.exportBlob();
//! download(blob, session.exportFileName());
//! ```

pub mod editor;

use annotator_core::validation;
use wasm_bindgen::prelude::*;

pub use editor::EditorSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Upload gate: only `application/pdf` files are offered to the editor
#[wasm_bindgen]
pub fn accepts_content_type(mime: &str) -> bool {
    validation::accepts_content_type(mime)
}

/// Quick validation check for a PDF file
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Get detailed PDF info without creating a session
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = validation::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    annotator_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_only_pdf_uploads() {
        assert!(accepts_content_type("application/pdf"));
        assert!(!accepts_content_type("image/png"));
    }
}
