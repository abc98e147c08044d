//! Tests for plan loading and the subcommand handlers
//!
//! Plans are applied to in-memory lopdf documents; only the `apply` file
//! round trip touches the filesystem (under the system temp dir).

use annotator_core::{AnnotateError, AnnotationSession, EditorConfig, LopdfMutator, Point};
use lopdf::{dictionary, Document, Object};
use pretty_assertions::assert_eq;

use crate::commands::{handle_apply, map_point, Direction};
use crate::error::PlanError;
use crate::plan::{apply_plan, load_plan, AnnotationInput, ApplyPlan};

fn letter_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn open(pages: usize) -> AnnotationSession {
    AnnotationSession::open(&LopdfMutator, "test.pdf", letter_pdf(pages), EditorConfig::default())
        .unwrap()
}

const PLAN: &str = r#"{
    "previews": [{ "page": 0, "width": 800, "height": 1035 }],
    "annotations": [
        { "type": "text", "x": 100, "y": 100, "content": "Approved", "rotation": -25 },
        { "type": "erase", "x": 50, "y": 300 },
        { "type": "blur", "page": 1, "x": 10, "y": 10, "width": 40, "height": 20 }
    ]
}"#;

#[test]
fn test_plan_parses_tagged_entries() {
    let plan = ApplyPlan::from_json(PLAN).unwrap();
    assert_eq!(plan.previews.len(), 1);
    assert_eq!(
        plan.annotations[1],
        AnnotationInput::Erase {
            page: 0,
            x: 50.0,
            y: 300.0,
            width: None,
            height: None,
        }
    );
    assert!(matches!(
        ApplyPlan::from_json(r#"{"annotations":[{"type":"stamp","x":1,"y":1}]}"#),
        Err(PlanError::Parse(_))
    ));
}

#[test]
fn test_load_plan_places_and_commits() {
    let mut session = open(2);
    let plan = ApplyPlan::from_json(PLAN).unwrap();
    let ids = load_plan(&mut session, &plan, None).unwrap();

    assert_eq!(ids.len(), 3);
    assert!(session.annotations().iter().all(|a| !a.is_draft()));

    let (content, style) = session.annotation(ids[0]).unwrap().text().unwrap();
    assert_eq!(content, "Approved");
    assert_eq!(style.rotation_degrees, 335);
    assert_eq!(style.font_size, 24.0);

    assert_eq!(session.preview_rect(ids[1]).unwrap().width, 200.0);
    // page 1 has no preview entry and falls back to its own size
    assert_eq!(session.geometry(1).unwrap().preview_width_pixels, 612.0);
}

#[test]
fn test_fallback_preview_applies_to_unlisted_pages() {
    let mut session = open(2);
    let plan = ApplyPlan::from_json(PLAN).unwrap();
    load_plan(&mut session, &plan, Some((306.0, 396.0))).unwrap();

    assert_eq!(session.geometry(0).unwrap().preview_width_pixels, 800.0);
    assert_eq!(session.geometry(1).unwrap().preview_width_pixels, 306.0);
}

#[test]
fn test_bad_entry_reports_its_index() {
    let mut session = open(1);
    let plan = ApplyPlan::from_json(
        r#"{"annotations":[
            {"type":"erase","x":1,"y":1},
            {"type":"blur","page":4,"x":1,"y":1}
        ]}"#,
    )
    .unwrap();

    match load_plan(&mut session, &plan, None) {
        Err(PlanError::Annotation { index, source }) => {
            assert_eq!(index, 1);
            assert!(matches!(source, AnnotateError::InvalidOperation(_)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_blank_text_entry_is_rejected() {
    let mut session = open(1);
    let plan = ApplyPlan::from_json(
        r#"{"annotations":[{"type":"text","x":1,"y":1,"content":""}]}"#,
    )
    .unwrap();

    assert!(matches!(
        load_plan(&mut session, &plan, None),
        Err(PlanError::Annotation { index: 0, .. })
    ));
    assert!(session.annotations().is_empty());
}

#[test]
fn test_apply_plan_exports_pdf() {
    let plan = ApplyPlan::from_json(PLAN).unwrap();
    let output = apply_plan(open(2), &plan, None).unwrap();
    assert!(output.bytes.starts_with(b"%PDF-"));
    assert_eq!(output.metrics.annotation_count, 3);
    assert_eq!(output.metrics.page_count, 2);
}

#[test]
fn test_map_point_both_directions() {
    let pdf = letter_pdf(1);
    let report = map_point(
        &pdf,
        0,
        (800.0, 1035.0),
        Point::new(100.0, 100.0),
        Direction::ToDocument,
    )
    .unwrap();
    assert!((report.to.x - 76.5).abs() < 1e-9);
    assert!((report.to.y - 715.48).abs() < 0.01);
    assert!((report.scale_x - 0.765).abs() < 1e-9);

    let back = map_point(&pdf, 0, (800.0, 1035.0), report.to, Direction::ToPreview).unwrap();
    assert!((back.to.x - 100.0).abs() < 1e-9);
    assert!((back.to.y - 100.0).abs() < 1e-9);

    assert!(map_point(&pdf, 0, (0.0, 1035.0), Point::default(), Direction::ToDocument).is_err());
    assert!(map_point(&pdf, 3, (800.0, 1035.0), Point::default(), Direction::ToDocument).is_err());
}

#[test]
fn test_handle_apply_writes_output_file() {
    let dir = std::env::temp_dir().join(format!("annotator-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("input.pdf");
    let plan = dir.join("plan.json");
    let output = dir.join("out.pdf");
    std::fs::write(&input, letter_pdf(2)).unwrap();
    std::fs::write(&plan, PLAN).unwrap();

    let report = handle_apply(&input, &plan, Some(output.as_path()), None, None).unwrap();
    assert_eq!(report.output, output);
    assert_eq!(report.annotations, 3);

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), report.metrics.output_size_bytes);

    std::fs::remove_dir_all(&dir).unwrap();
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Converting to points and back returns the original preview position
        #[test]
        fn prop_map_round_trip(
            width in 50.0f64..3000.0,
            height in 50.0f64..3000.0,
            x in 0.0f64..1.0,
            y in 0.0f64..1.0,
        ) {
            let pdf = letter_pdf(1);
            let point = Point::new(x * width, y * height);
            let doc = map_point(&pdf, 0, (width, height), point, Direction::ToDocument).unwrap();
            let back = map_point(&pdf, 0, (width, height), doc.to, Direction::ToPreview).unwrap();

            prop_assert!((back.to.x - point.x).abs() < 1e-6);
            prop_assert!((back.to.y - point.y).abs() < 1e-6);
            prop_assert!(doc.to.y >= -1e-9 && doc.to.y <= 792.0 + 1e-9);
        }

        /// Any clockwise rotation in a plan lands in [0, 360)
        #[test]
        fn prop_plan_rotation_is_normalized(rotation in -2000i32..2000) {
            let mut session = open(1);
            let plan = ApplyPlan {
                previews: Vec::new(),
                annotations: vec![AnnotationInput::Text {
                    page: 0,
                    x: 10.0,
                    y: 10.0,
                    content: "r".to_string(),
                    font_size: None,
                    color: None,
                    rotation,
                }],
            };
            let ids = load_plan(&mut session, &plan, None).unwrap();
            let (_, style) = session.annotation(ids[0]).unwrap().text().unwrap();
            prop_assert!(style.rotation_degrees < 360);
            prop_assert_eq!(i64::from(style.rotation_degrees), i64::from(rotation).rem_euclid(360));
        }
    }
}
