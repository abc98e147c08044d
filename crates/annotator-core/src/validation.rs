//! Upload gate: checks a file looks like a PDF before a session opens it

use serde::Serialize;

use crate::error::{AnnotateError, Result};
use crate::geometry::PageSize;
use crate::mutator::DocumentHandle;
use crate::pdf::LopdfHandle;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize)]
pub struct PdfInfo {
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    /// Size of every page in points, in page order
    pub page_sizes: Vec<PageSize>,
}

/// Only PDF uploads are accepted
pub fn accepts_content_type(mime: &str) -> bool {
    mime.split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
        .unwrap_or(false)
}

/// Quick validation without full parsing
pub fn quick_validate(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(AnnotateError::InvalidDocument(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(AnnotateError::InvalidDocument(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    Ok(())
}

/// Validate a PDF file and extract basic info
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo> {
    quick_validate(bytes)?;

    let handle = LopdfHandle::load(bytes)?;
    let page_sizes = (0..handle.page_count())
        .map(|index| handle.page_size(index))
        .collect::<Result<Vec<_>>>()?;

    Ok(PdfInfo {
        page_count: handle.page_count(),
        version: extract_version(bytes),
        encrypted: handle.is_encrypted(),
        size_bytes: bytes.len(),
        page_sizes,
    })
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}
