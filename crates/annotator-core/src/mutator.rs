//! Document mutation collaborator
//!
//! The export pipeline never touches PDF bytes itself. It loads the source
//! through a [`DocumentMutator`], draws through the returned
//! [`DocumentHandle`] and asks the handle to serialize the result.
//! All coordinates here are document space (points, bottom-left origin).

use crate::color::Rgb;
use crate::error::Result;
use crate::geometry::PageSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Baseline origin
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: Rgb,
    /// Counter-clockwise, as in PDF text matrices
    pub rotation_degrees: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPlacement {
    /// Bottom-left corner
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: Rgb,
    /// 1.0 is opaque
    pub opacity: f32,
}

pub trait DocumentMutator {
    type Handle: DocumentHandle;

    /// Parse source bytes. Failure is `InvalidDocument`.
    fn load(&self, bytes: &[u8]) -> Result<Self::Handle>;
}

pub trait DocumentHandle {
    fn page_count(&self) -> u32;

    /// Size of a zero-based page
    fn page_size(&self, page_index: u32) -> Result<PageSize>;

    fn draw_text(&mut self, page_index: u32, text: &str, placement: &TextPlacement) -> Result<()>;

    fn draw_rectangle(&mut self, page_index: u32, placement: &RectPlacement) -> Result<()>;

    /// Serialize the document. Failure is `ExportFailed`.
    fn save(self) -> Result<Vec<u8>>;
}
