//! Pending annotation edits for one loaded document
//!
//! The store keeps annotations in insertion order, which is also the order
//! they are drawn in. Each annotation moves through
//! `Draft -> Committed -> Draft -> ... -> removed`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};
use crate::geometry::{Point, Rect};

pub type AnnotationId = u64;

/// Default rotation step applied by the rotate button
pub const DEFAULT_ROTATION_STEP: i32 = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AnnotationState {
    /// Just placed or re-opened; fields are editable
    #[default]
    Draft,
    /// Locked and shown as a static overlay
    Committed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegionKind {
    /// Opaque cover in the page background color
    Erase,
    /// Translucent overlay; PDF has no real blur
    Blur,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnnotationKind {
    Text,
    Erase,
    Blur,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    /// Font size in points
    pub font_size: f64,
    /// "#RGB" or "#RRGGBB"; anything else renders black
    pub color: String,
    /// Clockwise on screen, always in [0, 360)
    #[serde(default)]
    pub rotation_degrees: u32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            color: "#000000".to_string(),
            rotation_degrees: 0,
        }
    }
}

impl TextStyle {
    fn validate(&self) -> Result<()> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(AnnotateError::InvalidOperation(format!(
                "Font size must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.rotation_degrees %= 360;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AnnotationBody {
    Text {
        content: String,
        style: TextStyle,
    },
    Region {
        width: f64,
        height: f64,
        kind: RegionKind,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    /// Zero-based page index
    pub page: u32,
    /// Top-left anchor in preview pixels at creation time
    pub position: Point,
    #[serde(default)]
    pub state: AnnotationState,
    #[serde(flatten)]
    pub body: AnnotationBody,
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match &self.body {
            AnnotationBody::Text { .. } => AnnotationKind::Text,
            AnnotationBody::Region {
                kind: RegionKind::Erase,
                ..
            } => AnnotationKind::Erase,
            AnnotationBody::Region {
                kind: RegionKind::Blur,
                ..
            } => AnnotationKind::Blur,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.state == AnnotationState::Draft
    }

    /// Preview-space bounds of a region; text has no intrinsic box
    pub fn region_rect(&self) -> Option<Rect> {
        match &self.body {
            AnnotationBody::Region { width, height, .. } => Some(Rect::new(
                self.position.x,
                self.position.y,
                *width,
                *height,
            )),
            AnnotationBody::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<(&str, &TextStyle)> {
        match &self.body {
            AnnotationBody::Text { content, style } => Some((content.as_str(), style)),
            AnnotationBody::Region { .. } => None,
        }
    }
}

/// Which annotation kinds an editor offers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Capabilities {
    pub text: bool,
    pub erase: bool,
    pub blur: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            text: true,
            erase: true,
            blur: true,
        }
    }

    pub fn allows(&self, kind: AnnotationKind) -> bool {
        match kind {
            AnnotationKind::Text => self.text,
            AnnotationKind::Erase => self.erase,
            AnnotationKind::Blur => self.blur,
        }
    }
}

/// Result of a text update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextUpdate {
    Updated,
    /// The content was blank, so the annotation is gone
    Removed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationStore {
    next_id: AnnotationId,
    annotations: Vec<Annotation>,
    #[serde(default)]
    capabilities: Capabilities,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Place a new text annotation in `Draft`. Positions are not clamped;
    /// blank content is rejected.
    pub fn add_text(
        &mut self,
        page: u32,
        position: Point,
        content: &str,
        style: TextStyle,
    ) -> Result<AnnotationId> {
        self.ensure_enabled(AnnotationKind::Text)?;
        style.validate()?;
        ensure_content(content)?;

        Ok(self.push(
            page,
            position,
            AnnotationBody::Text {
                content: content.to_string(),
                style: style.normalized(),
            },
        ))
    }

    pub fn add_region(
        &mut self,
        page: u32,
        position: Point,
        width: f64,
        height: f64,
        kind: RegionKind,
    ) -> Result<AnnotationId> {
        let annotation_kind = match kind {
            RegionKind::Erase => AnnotationKind::Erase,
            RegionKind::Blur => AnnotationKind::Blur,
        };
        self.ensure_enabled(annotation_kind)?;
        ensure_region_size(width, height)?;

        Ok(self.push(page, position, AnnotationBody::Region { width, height, kind }))
    }

    /// Replace a draft's text (and optionally its style).
    ///
    /// Blank content removes the annotation: empty text never persists.
    pub fn update_text(
        &mut self,
        id: AnnotationId,
        new_content: &str,
        new_style: Option<TextStyle>,
    ) -> Result<TextUpdate> {
        let index = self.index_of(id)?;
        let annotation = &self.annotations[index];
        if annotation.text().is_none() {
            return Err(AnnotateError::InvalidOperation(format!(
                "Annotation {} is not text",
                id
            )));
        }
        ensure_draft(annotation)?;
        if let Some(style) = &new_style {
            style.validate()?;
        }

        if new_content.trim().is_empty() {
            self.annotations.remove(index);
            return Ok(TextUpdate::Removed);
        }

        if let AnnotationBody::Text { content, style } = &mut self.annotations[index].body {
            *content = new_content.to_string();
            if let Some(new_style) = new_style {
                *style = new_style.normalized();
            }
        }
        Ok(TextUpdate::Updated)
    }

    /// Rotate a text draft by `delta` degrees, returning the new angle in [0, 360)
    pub fn rotate(&mut self, id: AnnotationId, delta: i32) -> Result<u32> {
        let index = self.index_of(id)?;
        let annotation = &mut self.annotations[index];
        ensure_draft(annotation)?;

        match &mut annotation.body {
            AnnotationBody::Text { style, .. } => {
                let rotated = (i64::from(style.rotation_degrees) + i64::from(delta)).rem_euclid(360);
                style.rotation_degrees = rotated as u32;
                Ok(style.rotation_degrees)
            }
            AnnotationBody::Region { .. } => Err(AnnotateError::InvalidOperation(format!(
                "Annotation {} is a region and cannot rotate",
                id
            ))),
        }
    }

    /// Lock a batch of annotations. Either every id is committed or none is.
    pub fn commit(&mut self, ids: &[AnnotationId]) -> Result<()> {
        let indices = ids
            .iter()
            .map(|id| self.index_of(*id))
            .collect::<Result<Vec<_>>>()?;

        for index in indices {
            self.annotations[index].state = AnnotationState::Committed;
        }
        Ok(())
    }

    /// Re-open a committed annotation for editing. Re-opening a draft is a no-op.
    pub fn reopen(&mut self, id: AnnotationId) -> Result<()> {
        let index = self.index_of(id)?;
        self.annotations[index].state = AnnotationState::Draft;
        Ok(())
    }

    pub fn remove(&mut self, id: AnnotationId) -> Result<Annotation> {
        let index = self.index_of(id)?;
        Ok(self.annotations.remove(index))
    }

    /// Snapshot in drawing order
    pub fn list(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get(&self, id: AnnotationId) -> Result<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.id == id)
            .ok_or(AnnotateError::NotFound(id))
    }

    pub fn annotations_for_page(&self, page: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page == page).collect()
    }

    /// Ids still in `Draft`, optionally restricted to one kind
    pub fn draft_ids(&self, kind: Option<AnnotationKind>) -> Vec<AnnotationId> {
        self.annotations
            .iter()
            .filter(|a| a.is_draft())
            .filter(|a| kind.map_or(true, |k| a.kind() == k))
            .map(|a| a.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Drop every annotation (file replaced). Ids keep increasing.
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a snapshot, re-checking everything `add_*` would have checked.
    ///
    /// Duplicate ids are rejected and the id counter is moved past the
    /// largest id present, so restored ids are never handed out again.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut store: Self = serde_json::from_str(json)?;

        let mut ids = BTreeSet::new();
        for annotation in &mut store.annotations {
            if !ids.insert(annotation.id) {
                return Err(AnnotateError::Serialization(format!(
                    "Duplicate annotation id {}",
                    annotation.id
                )));
            }
            match &mut annotation.body {
                AnnotationBody::Text { content, style } => {
                    style.validate()?;
                    ensure_content(content)?;
                    style.rotation_degrees %= 360;
                }
                AnnotationBody::Region { width, height, .. } => {
                    ensure_region_size(*width, *height)?;
                }
            }
        }
        if let Some(max_id) = ids.last() {
            store.next_id = store.next_id.max(max_id + 1);
        }
        Ok(store)
    }

    fn push(&mut self, page: u32, position: Point, body: AnnotationBody) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;

        self.annotations.push(Annotation {
            id,
            page,
            position,
            state: AnnotationState::Draft,
            body,
        });
        id
    }

    fn index_of(&self, id: AnnotationId) -> Result<usize> {
        self.annotations
            .iter()
            .position(|a| a.id == id)
            .ok_or(AnnotateError::NotFound(id))
    }

    fn ensure_enabled(&self, kind: AnnotationKind) -> Result<()> {
        if self.capabilities.allows(kind) {
            Ok(())
        } else {
            Err(AnnotateError::InvalidOperation(format!(
                "{:?} annotations are disabled in this editor",
                kind
            )))
        }
    }
}

fn ensure_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AnnotateError::InvalidOperation(
            "Text content must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn ensure_region_size(width: f64, height: f64) -> Result<()> {
    for (name, value) in [("width", width), ("height", height)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(AnnotateError::InvalidOperation(format!(
                "Region {} must be positive, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

fn ensure_draft(annotation: &Annotation) -> Result<()> {
    if annotation.is_draft() {
        Ok(())
    } else {
        Err(AnnotateError::InvalidOperation(format!(
            "Annotation {} is committed; reopen it first",
            annotation.id
        )))
    }
}
