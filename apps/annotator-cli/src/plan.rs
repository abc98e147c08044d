//! Annotation plans: a JSON description of the edits `apply` performs
//!
//! ```json
//! {
//!   "previews": [{ "page": 0, "width": 800, "height": 1035 }],
//!   "annotations": [
//!     { "type": "text", "x": 100, "y": 100, "content": "Approved", "rotation": 25 },
//!     { "type": "erase", "page": 0, "x": 50, "y": 300 },
//!     { "type": "blur", "x": 50, "y": 400, "width": 120, "height": 40 }
//!   ]
//! }
//! ```
//!
//! Positions are preview pixels. Pages without a preview entry use the
//! fallback preview size, or the page size itself (1 pixel = 1 point).

use annotator_core::{
    AnnotationId, AnnotationSession, ExportOutput, LopdfMutator, Point, RegionKind, TextStyle,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::PlanError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PreviewInput {
    pub page: u32,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationInput {
    Text {
        #[serde(default)]
        page: u32,
        x: f64,
        y: f64,
        content: String,
        font_size: Option<f64>,
        color: Option<String>,
        /// Clockwise degrees, may be negative
        #[serde(default)]
        rotation: i32,
    },
    Erase {
        #[serde(default)]
        page: u32,
        x: f64,
        y: f64,
        width: Option<f64>,
        height: Option<f64>,
    },
    Blur {
        #[serde(default)]
        page: u32,
        x: f64,
        y: f64,
        width: Option<f64>,
        height: Option<f64>,
    },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApplyPlan {
    #[serde(default)]
    pub previews: Vec<PreviewInput>,
    pub annotations: Vec<AnnotationInput>,
}

impl ApplyPlan {
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Measure every page, place the plan's annotations, commit them all
pub fn load_plan(
    session: &mut AnnotationSession,
    plan: &ApplyPlan,
    fallback_preview: Option<(f64, f64)>,
) -> Result<Vec<AnnotationId>, PlanError> {
    for page in 0..session.page_count() {
        let (width, height) = match plan.previews.iter().find(|p| p.page == page) {
            Some(preview) => (preview.width, preview.height),
            None => match fallback_preview {
                Some(size) => size,
                None => {
                    let size = session.page_size(page)?;
                    (size.width, size.height)
                }
            },
        };
        session.set_preview_size(page, width, height)?;
    }

    let mut ids = Vec::with_capacity(plan.annotations.len());
    for (index, input) in plan.annotations.iter().enumerate() {
        let id = place(session, input).map_err(PlanError::annotation(index))?;
        debug!(index, id, "placed annotation");
        ids.push(id);
    }
    session.commit(&ids)?;
    Ok(ids)
}

fn place(
    session: &mut AnnotationSession,
    input: &AnnotationInput,
) -> annotator_core::Result<AnnotationId> {
    match input {
        AnnotationInput::Text {
            page,
            x,
            y,
            content,
            font_size,
            color,
            rotation,
        } => {
            let defaults = session.config().default_text_style.clone();
            let style = TextStyle {
                font_size: font_size.unwrap_or(defaults.font_size),
                color: color.clone().unwrap_or(defaults.color),
                rotation_degrees: 0,
            };
            let id = session.add_text(*page, Point::new(*x, *y), content, style)?;
            if *rotation != 0 {
                session.rotate(id, *rotation)?;
            }
            Ok(id)
        }
        AnnotationInput::Erase {
            page,
            x,
            y,
            width,
            height,
        } => place_region(session, *page, *x, *y, *width, *height, RegionKind::Erase),
        AnnotationInput::Blur {
            page,
            x,
            y,
            width,
            height,
        } => place_region(session, *page, *x, *y, *width, *height, RegionKind::Blur),
    }
}

fn place_region(
    session: &mut AnnotationSession,
    page: u32,
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    kind: RegionKind,
) -> annotator_core::Result<AnnotationId> {
    let size = session.config().default_region_size;
    session.add_region(
        page,
        Point::new(x, y),
        width.unwrap_or(size.width),
        height.unwrap_or(size.height),
        kind,
    )
}

/// Load the plan into a fresh session and export it
pub fn apply_plan(
    mut session: AnnotationSession,
    plan: &ApplyPlan,
    fallback_preview: Option<(f64, f64)>,
) -> Result<ExportOutput, PlanError> {
    load_plan(&mut session, plan, fallback_preview)?;
    Ok(session.export(&LopdfMutator)?)
}
