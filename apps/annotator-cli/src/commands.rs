//! Subcommand handlers
//!
//! Each handler returns a serializable report; `main` prints it as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use annotator_core::coords::{to_document_space, to_preview_space};
use annotator_core::{
    validate_pdf, AnnotationSession, DocumentHandle, DocumentMutator, EditorConfig,
    ExportMetrics, LopdfMutator, PageGeometry, PdfInfo, Point,
};
use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::plan::{apply_plan, ApplyPlan};

#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub file: String,
    #[serde(flatten)]
    pub info: PdfInfo,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToDocument,
    ToPreview,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MapReport {
    pub page: u32,
    pub direction: Direction,
    pub from: Point,
    pub to: Point,
    /// Points per preview pixel
    pub scale_x: f64,
    pub scale_y: f64,
}

#[derive(Debug, Serialize)]
pub struct ApplyReport {
    pub output: PathBuf,
    pub annotations: usize,
    pub metrics: ExportMetrics,
}

fn read_pdf(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Handler: `info <input>`
pub fn handle_info(input: &Path) -> anyhow::Result<InfoReport> {
    let bytes = read_pdf(input)?;
    let info = validate_pdf(&bytes).with_context(|| format!("validating {}", input.display()))?;
    Ok(InfoReport {
        file: input.display().to_string(),
        info,
    })
}

/// Handler: `map`, converting one point for a page rendered at the given preview size
pub fn map_point(
    bytes: &[u8],
    page: u32,
    preview: (f64, f64),
    point: Point,
    direction: Direction,
) -> anyhow::Result<MapReport> {
    let size = LopdfMutator.load(bytes)?.page_size(page)?;
    let geometry = PageGeometry::from_page_size(size, preview.0, preview.1);
    geometry.ensure_ready(page)?;

    let to = match direction {
        Direction::ToDocument => to_document_space(point, &geometry)?,
        Direction::ToPreview => to_preview_space(point, &geometry)?,
    };
    Ok(MapReport {
        page,
        direction,
        from: point,
        to,
        scale_x: geometry.scale_x(),
        scale_y: geometry.scale_y(),
    })
}

pub fn handle_map(
    input: &Path,
    page: u32,
    preview: (f64, f64),
    point: Point,
    direction: Direction,
) -> anyhow::Result<MapReport> {
    map_point(&read_pdf(input)?, page, preview, point, direction)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            EditorConfig::from_json(&json)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(EditorConfig::default()),
    }
}

/// Handler: `apply <input> <plan>`
pub fn handle_apply(
    input: &Path,
    plan_path: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    fallback_preview: Option<(f64, f64)>,
) -> anyhow::Result<ApplyReport> {
    let config = load_config(config_path)?;
    let bytes = read_pdf(input)?;
    let plan_json = fs::read_to_string(plan_path)
        .with_context(|| format!("reading plan {}", plan_path.display()))?;
    let plan = ApplyPlan::from_json(&plan_json)?;

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let session = AnnotationSession::open(&LopdfMutator, name, bytes, config)
        .with_context(|| format!("opening {}", input.display()))?;
    let exported = apply_plan(session, &plan, fallback_preview)?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&exported.file_name));
    fs::write(&output, &exported.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        output = %output.display(),
        bytes = exported.bytes.len(),
        "wrote annotated document"
    );

    Ok(ApplyReport {
        output,
        annotations: plan.annotations.len(),
        metrics: exported.metrics,
    })
}
