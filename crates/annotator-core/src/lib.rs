//! PDF annotation core
//!
//! Place text, erase and blur annotations over a rendered page preview and
//! flatten them into a new PDF.
//!
//! - [`coords`]: preview pixels (top-left origin) to PDF points (bottom-left origin)
//! - [`annotations`]: the ordered, per-document list of pending edits
//! - [`export`]: draws every annotation through a [`DocumentMutator`]
//! - [`session`]: ties one loaded document to its store and preview geometry
//!
//! [`pdf::LopdfMutator`] is the lopdf-backed mutator used by the web and CLI apps.

pub mod annotations;
pub mod color;
pub mod config;
pub mod coords;
pub mod error;
pub mod export;
pub mod geometry;
pub mod mutator;
pub mod pdf;
pub mod session;
pub mod validation;

pub use annotations::{
    Annotation, AnnotationBody, AnnotationId, AnnotationKind, AnnotationState, AnnotationStore,
    Capabilities, RegionKind, TextStyle, TextUpdate,
};
pub use color::{hex_to_rgb, simulate_blur_color, Rgb};
pub use config::{EditorConfig, ExportStyle, RegionSize};
pub use error::{AnnotateError, Result};
pub use export::{export, ExportMetrics, ExportOutput, ExportRequest, DEFAULT_FILE_NAME};
pub use geometry::{PageGeometries, PageGeometry, PageSize, Point, Rect};
pub use mutator::{DocumentHandle, DocumentMutator, RectPlacement, TextPlacement};
pub use pdf::LopdfMutator;
pub use session::{AnnotationSession, ExportJob};
pub use validation::{validate_pdf, PdfInfo, PDF_MIME_TYPE};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    Ok(LopdfMutator.load(bytes)?.page_count())
}
