//! Geometry primitives shared by the mapper, the store and the export pipeline.
//!
//! Two coordinate spaces are in play:
//! - preview space: pixels of the rendered page element, origin top-left, y down
//! - document space: PDF points, origin bottom-left, y up

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Page dimensions in points (1 point = 1/72 inch)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// US Letter, used when a page carries no MediaBox at all
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
}

/// Measured relationship between one page and its rendered preview.
///
/// Captured once per rendered page instance. The points/pixels ratio is
/// independent per axis: fit-to-width or fit-to-height previews may not
/// preserve the page aspect ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageGeometry {
    pub width_points: f64,
    pub height_points: f64,
    pub preview_width_pixels: f64,
    pub preview_height_pixels: f64,
}

impl PageGeometry {
    pub fn new(
        width_points: f64,
        height_points: f64,
        preview_width_pixels: f64,
        preview_height_pixels: f64,
    ) -> Self {
        Self {
            width_points,
            height_points,
            preview_width_pixels,
            preview_height_pixels,
        }
    }

    pub fn from_page_size(size: PageSize, preview_width: f64, preview_height: f64) -> Self {
        Self::new(size.width, size.height, preview_width, preview_height)
    }

    /// A preview that has not reported a usable size cannot drive a conversion.
    pub fn is_ready(&self) -> bool {
        is_positive(self.preview_width_pixels) && is_positive(self.preview_height_pixels)
    }

    pub fn ensure_ready(&self, page: u32) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(AnnotateError::GeometryNotReady { page: Some(page) })
        }
    }

    /// Points per preview pixel along x
    pub fn scale_x(&self) -> f64 {
        self.width_points / self.preview_width_pixels
    }

    /// Points per preview pixel along y
    pub fn scale_y(&self) -> f64 {
        self.height_points / self.preview_height_pixels
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Geometry for every page that currently has a rendered preview.
///
/// Entries are replaced whole; a conversion never sees a half-updated page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageGeometries {
    pages: BTreeMap<u32, PageGeometry>,
}

impl PageGeometries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly measured geometry, returning the one it replaced
    pub fn replace(&mut self, page: u32, geometry: PageGeometry) -> Option<PageGeometry> {
        self.pages.insert(page, geometry)
    }

    /// Forget a page's measurement while it re-renders
    pub fn invalidate(&mut self, page: u32) -> Option<PageGeometry> {
        self.pages.remove(&page)
    }

    pub fn get(&self, page: u32) -> Result<&PageGeometry> {
        let geometry = self
            .pages
            .get(&page)
            .ok_or(AnnotateError::GeometryNotReady { page: Some(page) })?;
        geometry.ensure_ready(page)?;
        Ok(geometry)
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
