//! Apply pipeline: pristine source + annotation list -> new PDF bytes
//!
//! Export always starts from the original source bytes and the full current
//! annotation list, so consecutive exports never stack on each other.

use serde::Serialize;
use tracing::{debug, info};

use crate::annotations::{Annotation, AnnotationBody, RegionKind};
use crate::color::hex_to_rgb;
use crate::config::ExportStyle;
use crate::coords::{rect_to_document_space, rotation_to_document_space, to_document_space};
use crate::error::{AnnotateError, Result};
use crate::geometry::{PageGeometries, Rect};
use crate::mutator::{DocumentHandle, DocumentMutator, RectPlacement, TextPlacement};
use crate::validation::PDF_MIME_TYPE;

pub const DEFAULT_FILE_NAME: &str = "edited_pdf.pdf";

/// Everything one export needs, borrowed from the session or a snapshot
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub source: &'a [u8],
    pub annotations: &'a [Annotation],
    pub geometries: &'a PageGeometries,
    pub style: &'a ExportStyle,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub annotation_count: usize,
}

#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: String,
    pub metrics: ExportMetrics,
}

/// Draw every annotation, whatever its state, in list order and serialize.
///
/// Blur regions are translucent rectangles, not a pixel blur: the text
/// underneath stays in the file and can still be extracted.
pub fn export<M: DocumentMutator>(mutator: &M, request: &ExportRequest<'_>) -> Result<ExportOutput> {
    let mut handle = mutator.load(request.source)?;
    let page_count = handle.page_count();

    info!(
        annotations = request.annotations.len(),
        pages = page_count,
        "exporting document"
    );

    for annotation in request.annotations {
        draw_annotation(&mut handle, annotation, request, page_count)?;
    }

    let bytes = handle.save()?;
    info!(
        input_bytes = request.source.len(),
        output_bytes = bytes.len(),
        "export finished"
    );

    Ok(ExportOutput {
        metrics: ExportMetrics {
            input_size_bytes: request.source.len(),
            output_size_bytes: bytes.len(),
            page_count,
            annotation_count: request.annotations.len(),
        },
        bytes,
        mime_type: PDF_MIME_TYPE,
        file_name: DEFAULT_FILE_NAME.to_string(),
    })
}

fn draw_annotation<H: DocumentHandle>(
    handle: &mut H,
    annotation: &Annotation,
    request: &ExportRequest<'_>,
    page_count: u32,
) -> Result<()> {
    let page = annotation.page;
    if page >= page_count {
        return Err(AnnotateError::ExportFailed(format!(
            "Annotation {} targets page {} but the document has {} pages",
            annotation.id, page, page_count
        )));
    }
    let geometry = request.geometries.get(page)?;

    match &annotation.body {
        AnnotationBody::Text { content, style } => {
            let origin = to_document_space(annotation.position, geometry)?;
            let placement = TextPlacement {
                x: origin.x,
                y: origin.y,
                size: style.font_size,
                color: hex_to_rgb(&style.color),
                rotation_degrees: rotation_to_document_space(style.rotation_degrees),
            };
            debug!(id = annotation.id, page, x = origin.x, y = origin.y, "drawing text");
            handle.draw_text(page, content, &placement)?;
        }
        AnnotationBody::Region {
            width,
            height,
            kind,
        } => {
            let preview_rect = Rect::new(
                annotation.position.x,
                annotation.position.y,
                *width,
                *height,
            );
            let rect = rect_to_document_space(preview_rect, geometry)?;
            let (color, opacity) = match kind {
                RegionKind::Erase => (request.style.erase_rgb(), 1.0),
                RegionKind::Blur => (request.style.blur_rgb(), request.style.blur_opacity),
            };
            let placement = RectPlacement {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                color,
                opacity,
            };
            debug!(id = annotation.id, page, ?kind, "drawing region");
            handle.draw_rectangle(page, &placement)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationStore, TextStyle};
    use crate::color::Rgb;
    use crate::geometry::{PageGeometry, PageSize, Point};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Text(u32, String, TextPlacement),
        Rect(u32, RectPlacement),
    }

    /// Records drawing calls instead of touching a real PDF
    #[derive(Default)]
    struct RecordingMutator {
        calls: Rc<RefCell<Vec<Call>>>,
        fail_save: bool,
    }

    struct RecordingHandle {
        calls: Rc<RefCell<Vec<Call>>>,
        fail_save: bool,
    }

    impl DocumentMutator for RecordingMutator {
        type Handle = RecordingHandle;

        fn load(&self, bytes: &[u8]) -> Result<RecordingHandle> {
            if bytes.is_empty() {
                return Err(AnnotateError::InvalidDocument("empty".to_string()));
            }
            Ok(RecordingHandle {
                calls: Rc::clone(&self.calls),
                fail_save: self.fail_save,
            })
        }
    }

    impl DocumentHandle for RecordingHandle {
        fn page_count(&self) -> u32 {
            2
        }

        fn page_size(&self, _page_index: u32) -> Result<PageSize> {
            Ok(PageSize::LETTER)
        }

        fn draw_text(&mut self, page: u32, text: &str, placement: &TextPlacement) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Text(page, text.to_string(), *placement));
            Ok(())
        }

        fn draw_rectangle(&mut self, page: u32, placement: &RectPlacement) -> Result<()> {
            self.calls.borrow_mut().push(Call::Rect(page, *placement));
            Ok(())
        }

        fn save(self) -> Result<Vec<u8>> {
            if self.fail_save {
                return Err(AnnotateError::ExportFailed("disk full".to_string()));
            }
            Ok(b"%PDF-recorded".to_vec())
        }
    }

    fn one_to_one() -> PageGeometries {
        let mut geometries = PageGeometries::new();
        geometries.replace(0, PageGeometry::new(612.0, 792.0, 612.0, 792.0));
        geometries
    }

    fn run(
        mutator: &RecordingMutator,
        store: &AnnotationStore,
        geometries: &PageGeometries,
    ) -> Result<ExportOutput> {
        let style = ExportStyle::default();
        export(
            mutator,
            &ExportRequest {
                source: b"%PDF-source",
                annotations: store.list(),
                geometries,
                style: &style,
            },
        )
    }

    #[test]
    fn test_regions_map_to_bottom_left_rectangles() {
        let mut store = AnnotationStore::new();
        store
            .add_region(0, Point::new(50.0, 50.0), 200.0, 30.0, RegionKind::Erase)
            .unwrap();
        store
            .add_region(0, Point::new(50.0, 50.0), 200.0, 30.0, RegionKind::Blur)
            .unwrap();

        let mutator = RecordingMutator::default();
        let output = run(&mutator, &store, &one_to_one()).unwrap();
        assert_eq!(output.mime_type, "application/pdf");
        assert_eq!(output.file_name, "edited_pdf.pdf");

        let calls = mutator.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                Call::Rect(
                    0,
                    RectPlacement {
                        x: 50.0,
                        y: 712.0,
                        width: 200.0,
                        height: 30.0,
                        color: Rgb::WHITE,
                        opacity: 1.0,
                    }
                ),
                Call::Rect(
                    0,
                    RectPlacement {
                        x: 50.0,
                        y: 712.0,
                        width: 200.0,
                        height: 30.0,
                        color: Rgb::gray(0.5),
                        opacity: 0.5,
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_text_uses_style_and_document_rotation() {
        let mut store = AnnotationStore::new();
        let id = store
            .add_text(
                0,
                Point::new(100.0, 92.0),
                "Signed",
                TextStyle {
                    font_size: 18.0,
                    color: "#F00".to_string(),
                    rotation_degrees: 0,
                },
            )
            .unwrap();
        store.rotate(id, 25).unwrap();
        store.commit(&[id]).unwrap();

        let mutator = RecordingMutator::default();
        run(&mutator, &store, &one_to_one()).unwrap();

        let calls = mutator.calls.borrow();
        let Call::Text(page, text, placement) = &calls[0] else {
            panic!("expected text, got {:?}", calls[0]);
        };
        assert_eq!((*page, text.as_str()), (0, "Signed"));
        assert!((placement.x - 100.0).abs() < 1e-9);
        assert!((placement.y - 700.0).abs() < 1e-9);
        assert_eq!(placement.size, 18.0);
        assert_eq!(placement.color, Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(placement.rotation_degrees, 335);
    }

    #[test]
    fn test_drafts_and_committed_are_both_drawn_in_order() {
        let mut store = AnnotationStore::new();
        let first = store
            .add_text(0, Point::new(1.0, 1.0), "first", TextStyle::default())
            .unwrap();
        store
            .add_text(0, Point::new(2.0, 2.0), "second", TextStyle::default())
            .unwrap();
        store.commit(&[first]).unwrap();

        let mutator = RecordingMutator::default();
        let output = run(&mutator, &store, &one_to_one()).unwrap();

        let texts: Vec<String> = mutator
            .calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Text(_, text, _) => Some(text.clone()),
                Call::Rect(..) => None,
            })
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(output.metrics.annotation_count, 2);
    }

    #[test]
    fn test_every_annotation_is_drawn_once() {
        let mut store = AnnotationStore::new();
        store
            .add_text(0, Point::default(), "note", TextStyle::default())
            .unwrap();
        store
            .add_region(0, Point::default(), 10.0, 10.0, RegionKind::Erase)
            .unwrap();
        store
            .add_region(0, Point::default(), 10.0, 10.0, RegionKind::Blur)
            .unwrap();

        let mutator = RecordingMutator::default();
        let output = run(&mutator, &store, &one_to_one()).unwrap();
        assert_eq!(mutator.calls.borrow().len(), 3);
        assert_eq!(output.metrics.annotation_count, 3);
    }

    #[test]
    fn test_unmeasured_page_fails() {
        let mut store = AnnotationStore::new();
        store
            .add_region(1, Point::default(), 10.0, 10.0, RegionKind::Erase)
            .unwrap();

        let mutator = RecordingMutator::default();
        assert_eq!(
            run(&mutator, &store, &one_to_one()).unwrap_err(),
            AnnotateError::GeometryNotReady { page: Some(1) }
        );
    }

    #[test]
    fn test_page_out_of_range_fails() {
        let mut store = AnnotationStore::new();
        store
            .add_region(5, Point::default(), 10.0, 10.0, RegionKind::Erase)
            .unwrap();

        let mutator = RecordingMutator::default();
        assert!(matches!(
            run(&mutator, &store, &one_to_one()),
            Err(AnnotateError::ExportFailed(_))
        ));
    }

    #[test]
    fn test_collaborator_failures_surface() {
        let store = AnnotationStore::new();
        let mutator = RecordingMutator {
            fail_save: true,
            ..RecordingMutator::default()
        };
        assert!(matches!(
            run(&mutator, &store, &one_to_one()),
            Err(AnnotateError::ExportFailed(_))
        ));

        let style = ExportStyle::default();
        let result = export(
            &RecordingMutator::default(),
            &ExportRequest {
                source: b"",
                annotations: store.list(),
                geometries: &one_to_one(),
                style: &style,
            },
        );
        assert!(matches!(result, Err(AnnotateError::InvalidDocument(_))));
    }
}
