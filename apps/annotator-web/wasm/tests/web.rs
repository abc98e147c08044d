//! Browser-only checks for the JS-facing export paths
#![cfg(target_arch = "wasm32")]

use annotator_wasm::EditorSession;
use lopdf::{dictionary, Document, Object};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn letter_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
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

#[wasm_bindgen_test]
fn export_returns_pdf_bytes() {
    let mut session = EditorSession::new("test.pdf", &letter_pdf(), None).unwrap();
    session.set_preview_size(0, 612.0, 792.0).unwrap();
    session.add_region(10.0, 10.0, "erase").unwrap();

    let bytes = session.export().unwrap().to_vec();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[wasm_bindgen_test]
fn export_blob_is_typed_as_pdf() {
    let mut session = EditorSession::new("test.pdf", &letter_pdf(), None).unwrap();
    let blob = session.export_blob().unwrap();
    assert_eq!(blob.type_(), "application/pdf");
    assert!(blob.size() > 0.0);
}

#[wasm_bindgen_test]
fn unmeasured_export_is_a_js_error() {
    let mut session = EditorSession::new("test.pdf", &letter_pdf(), None).unwrap();
    session.add_text(5.0, 5.0).unwrap();
    assert!(session.export().is_err());
}
