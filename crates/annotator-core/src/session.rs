//! Annotation session: one loaded document and its pending edits
//!
//! The session owns the pristine source bytes, the annotation store and the
//! measured preview geometry of each page. Replacing the file means opening
//! a new session; nothing carries over.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::annotations::{
    Annotation, AnnotationId, AnnotationKind, AnnotationStore, RegionKind, TextStyle, TextUpdate,
};
use crate::config::{EditorConfig, ExportStyle};
use crate::coords::{rect_to_document_space, to_document_space};
use crate::error::{AnnotateError, Result};
use crate::export::{export, ExportOutput, ExportRequest};
use crate::geometry::{PageGeometries, PageGeometry, PageSize, Point, Rect};
use crate::mutator::{DocumentHandle, DocumentMutator};

pub struct AnnotationSession {
    name: String,
    source: Arc<[u8]>,
    page_sizes: Vec<PageSize>,
    config: EditorConfig,
    store: AnnotationStore,
    geometries: PageGeometries,
    current_page: u32,
    exporting: bool,
}

impl AnnotationSession {
    /// Load `bytes` through the mutator and start an empty session
    pub fn open<M: DocumentMutator>(
        mutator: &M,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        config: EditorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let source: Arc<[u8]> = bytes.into();
        let handle = mutator.load(&source)?;
        let page_sizes = (0..handle.page_count())
            .map(|page| handle.page_size(page))
            .collect::<Result<Vec<_>>>()?;

        let name = name.into();
        info!(name = %name, pages = page_sizes.len(), bytes = source.len(), "opened document");

        Ok(Self {
            name,
            source,
            page_sizes,
            store: AnnotationStore::with_capabilities(config.capabilities),
            config,
            geometries: PageGeometries::new(),
            current_page: 0,
            exporting: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    pub fn page_size(&self, page: u32) -> Result<PageSize> {
        self.page_sizes.get(page as usize).copied().ok_or_else(|| {
            AnnotateError::InvalidOperation(format!(
                "Page {} out of range (document has {} pages)",
                page,
                self.page_sizes.len()
            ))
        })
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn set_current_page(&mut self, page: u32) -> Result<()> {
        self.page_size(page)?;
        self.current_page = page;
        Ok(())
    }

    /// Record the rendered size of a page's preview.
    ///
    /// The page's geometry is replaced whole. An unusable size (zero, negative
    /// or non-finite) drops the old measurement instead, since the preview no
    /// longer has that size.
    pub fn set_preview_size(&mut self, page: u32, width: f64, height: f64) -> Result<()> {
        let geometry = PageGeometry::from_page_size(self.page_size(page)?, width, height);
        if let Err(e) = geometry.ensure_ready(page) {
            warn!(page, width, height, "preview size is not usable");
            self.geometries.invalidate(page);
            return Err(e);
        }
        debug!(page, width, height, "preview measured");
        self.geometries.replace(page, geometry);
        Ok(())
    }

    pub fn geometry(&self, page: u32) -> Result<&PageGeometry> {
        self.geometries.get(page)
    }

    /// Place placeholder text with the default style on the current page
    pub fn add_text_at(&mut self, position: Point) -> Result<AnnotationId> {
        self.add_text_on(self.current_page, position)
    }

    pub fn add_text_on(&mut self, page: u32, position: Point) -> Result<AnnotationId> {
        let content = self.config.placeholder_text.clone();
        let style = self.config.default_text_style.clone();
        self.add_text(page, position, &content, style)
    }

    pub fn add_text(
        &mut self,
        page: u32,
        position: Point,
        content: &str,
        style: TextStyle,
    ) -> Result<AnnotationId> {
        self.page_size(page)?;
        self.store.add_text(page, position, content, style)
    }

    /// Place a default-sized region on the current page
    pub fn add_region_at(&mut self, position: Point, kind: RegionKind) -> Result<AnnotationId> {
        self.add_region_on(self.current_page, position, kind)
    }

    pub fn add_region_on(
        &mut self,
        page: u32,
        position: Point,
        kind: RegionKind,
    ) -> Result<AnnotationId> {
        let size = self.config.default_region_size;
        self.add_region(page, position, size.width, size.height, kind)
    }

    pub fn add_region(
        &mut self,
        page: u32,
        position: Point,
        width: f64,
        height: f64,
        kind: RegionKind,
    ) -> Result<AnnotationId> {
        self.page_size(page)?;
        self.store.add_region(page, position, width, height, kind)
    }

    pub fn update_text(
        &mut self,
        id: AnnotationId,
        content: &str,
        style: Option<TextStyle>,
    ) -> Result<TextUpdate> {
        self.store.update_text(id, content, style)
    }

    pub fn rotate(&mut self, id: AnnotationId, delta: i32) -> Result<u32> {
        self.store.rotate(id, delta)
    }

    /// Rotate by the configured step, clockwise or counter-clockwise
    pub fn rotate_step(&mut self, id: AnnotationId, clockwise: bool) -> Result<u32> {
        let step = self.config.rotation_step_degrees;
        self.store.rotate(id, if clockwise { step } else { -step })
    }

    pub fn commit(&mut self, ids: &[AnnotationId]) -> Result<()> {
        self.store.commit(ids)
    }

    /// Commit every draft, optionally of one kind only. Returns the ids committed.
    pub fn commit_drafts(&mut self, kind: Option<AnnotationKind>) -> Result<Vec<AnnotationId>> {
        let ids = self.store.draft_ids(kind);
        self.store.commit(&ids)?;
        Ok(ids)
    }

    pub fn reopen(&mut self, id: AnnotationId) -> Result<()> {
        self.store.reopen(id)
    }

    pub fn remove(&mut self, id: AnnotationId) -> Result<Annotation> {
        self.store.remove(id)
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.list()
    }

    pub fn annotation(&self, id: AnnotationId) -> Result<&Annotation> {
        self.store.get(id)
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Rectangle of a region annotation in preview pixels, for overlay rendering
    pub fn preview_rect(&self, id: AnnotationId) -> Result<Rect> {
        self.store.get(id)?.region_rect().ok_or_else(|| {
            AnnotateError::InvalidOperation(format!("Annotation {} is not a region", id))
        })
    }

    /// Where an annotation's anchor lands on the page, in points
    pub fn document_position(&self, id: AnnotationId) -> Result<Point> {
        let annotation = self.store.get(id)?;
        let geometry = self.geometries.get(annotation.page)?;
        match annotation.region_rect() {
            Some(rect) => Ok(rect_to_document_space(rect, geometry)?.origin()),
            None => to_document_space(annotation.position, geometry),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Snapshot everything an export needs and mark the session busy.
    ///
    /// The returned job owns its data and can run on another thread while
    /// the session keeps accepting edits.
    pub fn begin_export(&mut self) -> Result<ExportJob> {
        if self.exporting {
            return Err(AnnotateError::ExportInProgress);
        }
        self.exporting = true;
        Ok(ExportJob {
            source: Arc::clone(&self.source),
            annotations: self.store.list().to_vec(),
            geometries: self.geometries.clone(),
            style: self.config.export_style.clone(),
        })
    }

    pub fn finish_export(&mut self) {
        self.exporting = false;
    }

    /// Run a full export. The store is never modified, whatever the outcome.
    pub fn export<M: DocumentMutator>(&mut self, mutator: &M) -> Result<ExportOutput> {
        let job = self.begin_export()?;
        let result = job.run(mutator);
        self.finish_export();
        if let Err(e) = &result {
            warn!(name = %self.name, error = %e, "export failed");
        }
        result
    }

    /// Drop all annotations and preview measurements
    pub fn reset(&mut self) {
        self.store.clear();
        self.geometries.clear();
        self.current_page = 0;
    }
}

/// Detached snapshot of a session, ready to export
#[derive(Debug, Clone)]
pub struct ExportJob {
    source: Arc<[u8]>,
    annotations: Vec<Annotation>,
    geometries: PageGeometries,
    style: ExportStyle,
}

impl ExportJob {
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn run<M: DocumentMutator>(&self, mutator: &M) -> Result<ExportOutput> {
        export(
            mutator,
            &ExportRequest {
                source: &self.source,
                annotations: &self.annotations,
                geometries: &self.geometries,
                style: &self.style,
            },
        )
    }
}
