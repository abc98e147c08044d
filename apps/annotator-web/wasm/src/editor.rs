//! Browser-facing annotation session
//!
//! A thin wasm-bindgen wrapper around [`AnnotationSession`]. JavaScript
//! reports pointer positions in preview pixels and the rendered size of each
//! page; everything else happens in Rust.

use annotator_core::{
    AnnotateError, AnnotationKind, AnnotationSession, EditorConfig, ExportMetrics, ExportOutput,
    LopdfMutator, Point, RegionKind, TextStyle, TextUpdate,
};
use wasm_bindgen::prelude::*;

fn js_error(e: AnnotateError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_kind(kind: &str) -> Result<AnnotationKind, AnnotateError> {
    match kind.to_lowercase().as_str() {
        "text" => Ok(AnnotationKind::Text),
        "erase" => Ok(AnnotationKind::Erase),
        "blur" => Ok(AnnotationKind::Blur),
        other => Err(AnnotateError::InvalidOperation(format!(
            "Unknown annotation kind: {}",
            other
        ))),
    }
}

fn parse_region_kind(kind: &str) -> Result<RegionKind, AnnotateError> {
    match parse_kind(kind)? {
        AnnotationKind::Erase => Ok(RegionKind::Erase),
        AnnotationKind::Blur => Ok(RegionKind::Blur),
        AnnotationKind::Text => Err(AnnotateError::InvalidOperation(
            "Text is not a region kind".to_string(),
        )),
    }
}

/// Editing session for one uploaded PDF
#[wasm_bindgen]
pub struct EditorSession {
    inner: AnnotationSession,
    last_export: Option<ExportMetrics>,
}

#[wasm_bindgen]
impl EditorSession {
    /// Open a PDF. `config_json` is an optional, possibly partial, editor config.
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8], config_json: Option<String>) -> Result<EditorSession, JsValue> {
        Self::open(name, bytes, config_json.as_deref()).map_err(js_error)
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.inner.name().to_string()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.inner.current_page()
    }

    #[wasm_bindgen(js_name = setCurrentPage)]
    pub fn set_current_page(&mut self, page: u32) -> Result<(), JsValue> {
        self.inner.set_current_page(page).map_err(js_error)
    }

    /// Page size in points as `[width, height]`
    #[wasm_bindgen(js_name = getPageSize)]
    pub fn get_page_size(&self, page: u32) -> Result<Vec<f64>, JsValue> {
        let size = self.inner.page_size(page).map_err(js_error)?;
        Ok(vec![size.width, size.height])
    }

    /// Report the rendered size of a page preview, in pixels
    #[wasm_bindgen(js_name = setPreviewSize)]
    pub fn set_preview_size(&mut self, page: u32, width: f64, height: f64) -> Result<(), JsValue> {
        self.inner
            .set_preview_size(page, width, height)
            .map_err(js_error)
    }

    /// Place placeholder text on the current page at a preview position
    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&mut self, x: f64, y: f64) -> Result<u64, JsValue> {
        self.inner.add_text_at(Point::new(x, y)).map_err(js_error)
    }

    /// Place a default-sized "erase" or "blur" region on the current page
    #[wasm_bindgen(js_name = addRegion)]
    pub fn add_region(&mut self, x: f64, y: f64, kind: &str) -> Result<u64, JsValue> {
        let kind = parse_region_kind(kind).map_err(js_error)?;
        self.inner
            .add_region_at(Point::new(x, y), kind)
            .map_err(js_error)
    }

    /// Returns false when blank content removed the annotation
    #[wasm_bindgen(js_name = updateText)]
    pub fn update_text(&mut self, id: u64, content: &str) -> Result<bool, JsValue> {
        self.apply_text_update(id, content, None).map_err(js_error)
    }

    #[wasm_bindgen(js_name = updateTextWithStyle)]
    pub fn update_text_with_style(
        &mut self,
        id: u64,
        content: &str,
        font_size: f64,
        color: &str,
    ) -> Result<bool, JsValue> {
        let rotation_degrees = self
            .inner
            .annotation(id)
            .ok()
            .and_then(|a| a.text().map(|(_, style)| style.rotation_degrees))
            .unwrap_or_default();
        let style = TextStyle {
            font_size,
            color: color.to_string(),
            rotation_degrees,
        };
        self.apply_text_update(id, content, Some(style))
            .map_err(js_error)
    }

    /// Rotate a text draft one step; returns the new angle
    #[wasm_bindgen(js_name = rotateStep)]
    pub fn rotate_step(&mut self, id: u64, clockwise: bool) -> Result<u32, JsValue> {
        self.inner.rotate_step(id, clockwise).map_err(js_error)
    }

    pub fn commit(&mut self, ids: Vec<u64>) -> Result<(), JsValue> {
        self.inner.commit(&ids).map_err(js_error)
    }

    /// Commit every draft, or only drafts of `kind` ("text", "erase", "blur")
    #[wasm_bindgen(js_name = commitDrafts)]
    pub fn commit_drafts(&mut self, kind: Option<String>) -> Result<Vec<u64>, JsValue> {
        let kind = kind
            .as_deref()
            .map(parse_kind)
            .transpose()
            .map_err(js_error)?;
        self.inner.commit_drafts(kind).map_err(js_error)
    }

    pub fn reopen(&mut self, id: u64) -> Result<(), JsValue> {
        self.inner.reopen(id).map_err(js_error)
    }

    pub fn remove(&mut self, id: u64) -> Result<(), JsValue> {
        self.inner.remove(id).map(|_| ()).map_err(js_error)
    }

    /// `[x, y, width, height]` of a region in preview pixels
    #[wasm_bindgen(js_name = previewRect)]
    pub fn preview_rect(&self, id: u64) -> Result<Vec<f64>, JsValue> {
        let rect = self.inner.preview_rect(id).map_err(js_error)?;
        Ok(vec![rect.x, rect.y, rect.width, rect.height])
    }

    #[wasm_bindgen(js_name = getAnnotationCount)]
    pub fn get_annotation_count(&self) -> usize {
        self.inner.annotations().len()
    }

    #[wasm_bindgen(js_name = getAnnotationsJson)]
    pub fn get_annotations_json(&self) -> Result<String, JsValue> {
        self.annotations_json().map_err(js_error)
    }

    #[wasm_bindgen(js_name = getAnnotations)]
    pub fn get_annotations(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.annotations())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(getter, js_name = isExporting)]
    pub fn is_exporting(&self) -> bool {
        self.inner.is_exporting()
    }

    /// Flatten every annotation into a new PDF
    pub fn export(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        let output = self.run_export().map_err(js_error)?;
        let array = js_sys::Uint8Array::new_with_length(output.bytes.len() as u32);
        array.copy_from(&output.bytes);
        Ok(array)
    }

    /// Same as `export`, wrapped in a Blob typed `application/pdf` for download
    #[wasm_bindgen(js_name = exportBlob)]
    pub fn export_blob(&mut self) -> Result<web_sys::Blob, JsValue> {
        let output = self.run_export().map_err(js_error)?;
        let array = js_sys::Uint8Array::from(output.bytes.as_slice());
        let parts = js_sys::Array::of1(&array);

        let options = web_sys::BlobPropertyBag::new();
        options.set_type(output.mime_type);
        web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
    }

    /// Suggested download name for the exported file
    #[wasm_bindgen(js_name = exportFileName)]
    pub fn export_file_name(&self) -> String {
        annotator_core::DEFAULT_FILE_NAME.to_string()
    }

    /// Byte counts of the most recent export, as JSON. `None` before the first export.
    #[wasm_bindgen(js_name = getLastExportJson)]
    pub fn get_last_export_json(&self) -> Result<Option<String>, JsValue> {
        self.last_export_json().map_err(js_error)
    }

    /// Forget all annotations and preview sizes
    pub fn reset(&mut self) {
        self.inner.reset();
        self.last_export = None;
    }
}

impl EditorSession {
    pub fn open(name: &str, bytes: &[u8], config_json: Option<&str>) -> annotator_core::Result<Self> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(json)?,
            None => EditorConfig::default(),
        };
        let inner = AnnotationSession::open(&LopdfMutator, name, bytes.to_vec(), config)?;
        Ok(Self {
            inner,
            last_export: None,
        })
    }

    pub fn session(&self) -> &AnnotationSession {
        &self.inner
    }

    fn apply_text_update(
        &mut self,
        id: u64,
        content: &str,
        style: Option<TextStyle>,
    ) -> annotator_core::Result<bool> {
        Ok(self.inner.update_text(id, content, style)? == TextUpdate::Updated)
    }

    fn annotations_json(&self) -> annotator_core::Result<String> {
        Ok(serde_json::to_string(self.inner.annotations())?)
    }

    fn last_export_json(&self) -> annotator_core::Result<Option<String>> {
        self.last_export
            .as_ref()
            .map(|metrics| serde_json::to_string(metrics).map_err(AnnotateError::from))
            .transpose()
    }

    pub fn last_export(&self) -> Option<&ExportMetrics> {
        self.last_export.as_ref()
    }

    pub fn run_export(&mut self) -> annotator_core::Result<ExportOutput> {
        let output = self.inner.export(&LopdfMutator)?;
        self.last_export = Some(output.metrics.clone());
        Ok(output)
    }
}
