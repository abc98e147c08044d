//! lopdf implementation of the document mutation collaborator
//!
//! Drawing is flattened into the page: every page that receives drawings
//! gets one extra content stream, appended after the original content.
//! The original content is wrapped in `q`/`Q` so whatever graphics state
//! it leaves behind cannot leak into the overlay.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat, Stream};
use tracing::debug;

use crate::error::{AnnotateError, Result};
use crate::geometry::PageSize;
use crate::mutator::{DocumentHandle, DocumentMutator, RectPlacement, TextPlacement};

const FONT_RESOURCE: &str = "AnnotF1";
const LINE_HEIGHT_FACTOR: f64 = 1.2;
/// Guard against cyclic page trees when walking up for inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// Loads documents with lopdf
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMutator;

impl DocumentMutator for LopdfMutator {
    type Handle = LopdfHandle;

    fn load(&self, bytes: &[u8]) -> Result<LopdfHandle> {
        LopdfHandle::load(bytes)
    }
}

/// A loaded document plus the drawing operations queued for each page
pub struct LopdfHandle {
    doc: Document,
    pages: Vec<ObjectId>,
    pending: BTreeMap<u32, Vec<Operation>>,
    font_id: Option<ObjectId>,
    /// Opacity (as f32 bits) -> ExtGState resource name and object
    graphics_states: BTreeMap<u32, (String, ObjectId)>,
}

impl LopdfHandle {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc =
            Document::load_mem(bytes).map_err(|e| AnnotateError::InvalidDocument(e.to_string()))?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(AnnotateError::InvalidDocument("PDF has no pages".to_string()));
        }

        Ok(Self {
            doc,
            pages,
            pending: BTreeMap::new(),
            font_id: None,
            graphics_states: BTreeMap::new(),
        })
    }

    fn page_id(&self, page_index: u32) -> Result<ObjectId> {
        self.pages.get(page_index as usize).copied().ok_or_else(|| {
            AnnotateError::ExportFailed(format!(
                "Page index {} out of range (document has {} pages)",
                page_index,
                self.pages.len()
            ))
        })
    }

    /// MediaBox of a page, inheriting from parents, US Letter when absent
    fn media_box(&self, page_index: u32) -> Result<[f64; 4]> {
        let page_id = self.page_id(page_index)?;
        let mut current = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;

        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(media_box) = current.get(b"MediaBox") {
                let media_box = self.resolve(media_box);
                if let Ok(array) = media_box.as_array() {
                    return parse_box_array(array);
                }
            }
            match current
                .get(b"Parent")
                .and_then(Object::as_reference)
                .and_then(|id| self.doc.get_object(id))
                .and_then(Object::as_dict)
            {
                Ok(parent) => current = parent,
                Err(_) => break,
            }
        }

        Ok([0.0, 0.0, PageSize::LETTER.width, PageSize::LETTER.height])
    }

    /// Lower-left corner of the MediaBox, whichever order its corners are written in
    fn origin(&self, page_index: u32) -> Result<(f64, f64)> {
        let [x1, y1, x2, y2] = self.media_box(page_index)?;
        Ok((x1.min(x2), y1.min(y2)))
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(object),
            other => other,
        }
    }

    fn ensure_font(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    fn ensure_graphics_state(&mut self, opacity: f32) -> (String, ObjectId) {
        let key = opacity.to_bits();
        if let Some(entry) = self.graphics_states.get(&key) {
            return entry.clone();
        }
        let name = format!("AnnotGs{}", self.graphics_states.len());
        let id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(opacity),
            "CA" => Object::Real(opacity),
        });
        self.graphics_states.insert(key, (name.clone(), id));
        (name, id)
    }

    /// Resources in effect for a page, and the object holding them if shared
    fn effective_resources(&self, page_id: ObjectId) -> Result<(Option<ObjectId>, Dictionary)> {
        let mut current = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;
        let mut inherited = false;

        for _ in 0..MAX_TREE_DEPTH {
            match current.get(b"Resources") {
                Ok(Object::Reference(id)) => {
                    let dict = self
                        .doc
                        .get_object(*id)
                        .and_then(Object::as_dict)
                        .cloned()
                        .unwrap_or_else(|_| Dictionary::new());
                    // Inherited resources are copied onto the page, never edited in place
                    let target = if inherited { None } else { Some(*id) };
                    return Ok((target, dict));
                }
                Ok(Object::Dictionary(dict)) => return Ok((None, dict.clone())),
                _ => {}
            }
            match current
                .get(b"Parent")
                .and_then(Object::as_reference)
                .and_then(|id| self.doc.get_object(id))
                .and_then(Object::as_dict)
            {
                Ok(parent) => {
                    current = parent;
                    inherited = true;
                }
                Err(_) => break,
            }
        }

        Ok((None, Dictionary::new()))
    }

    fn register_resource(
        &mut self,
        page_id: ObjectId,
        category: &str,
        name: &str,
        resource_id: ObjectId,
    ) -> Result<()> {
        let (target, mut resources) = self.effective_resources(page_id)?;

        let mut entries = match resources.get(category.as_bytes()) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(id)) => self
                .doc
                .get_object(*id)
                .and_then(Object::as_dict)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };
        entries.set(name, Object::Reference(resource_id));
        resources.set(category, Object::Dictionary(entries));

        match target {
            Some(id) => {
                let object = self
                    .doc
                    .get_object_mut(id)
                    .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;
                *object = Object::Dictionary(resources);
            }
            None => {
                let page = self
                    .doc
                    .get_object_mut(page_id)
                    .and_then(Object::as_dict_mut)
                    .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;
                page.set("Resources", Object::Dictionary(resources));
            }
        }
        Ok(())
    }

    fn queue(&mut self, page_index: u32, operations: Vec<Operation>) {
        self.pending.entry(page_index).or_default().extend(operations);
    }

    /// Write queued operations into each page's content
    fn flush(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for (page_index, operations) in pending {
            let page_id = self.page_id(page_index)?;

            let mut overlay = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];
            overlay.extend(operations);
            overlay.push(Operation::new("Q", vec![]));

            let save_state = encode(vec![Operation::new("q", vec![])])?;
            let overlay = encode(overlay)?;

            let save_id = self
                .doc
                .add_object(Stream::new(Dictionary::new(), save_state));
            let overlay_id = self.doc.add_object(Stream::new(Dictionary::new(), overlay));

            let existing = self.existing_contents(page_id)?;
            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(save_id));
            contents.extend(existing);
            contents.push(Object::Reference(overlay_id));

            let page = self
                .doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;
            page.set("Contents", Object::Array(contents));

            debug!(page = page_index, "flushed overlay content stream");
        }
        Ok(())
    }

    fn existing_contents(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let page = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;

        Ok(match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                // An indirect array of streams
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        })
    }
}

impl DocumentHandle for LopdfHandle {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_index: u32) -> Result<PageSize> {
        let [x1, y1, x2, y2] = self.media_box(page_index)?;
        Ok(PageSize {
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        })
    }

    fn draw_text(&mut self, page_index: u32, text: &str, placement: &TextPlacement) -> Result<()> {
        let page_id = self.page_id(page_index)?;
        let (origin_x, origin_y) = self.origin(page_index)?;

        let font_id = self.ensure_font();
        self.register_resource(page_id, "Font", FONT_RESOURCE, font_id)?;

        let angle = f64::from(placement.rotation_degrees).to_radians();
        let (sin, cos) = angle.sin_cos();
        let color = placement.color;

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    real(placement.size),
                ],
            ),
            Operation::new("TL", vec![real(placement.size * LINE_HEIGHT_FACTOR)]),
            Operation::new(
                "rg",
                vec![
                    Object::Real(color.r),
                    Object::Real(color.g),
                    Object::Real(color.b),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    real(cos),
                    real(sin),
                    real(-sin),
                    real(cos),
                    real(origin_x + placement.x),
                    real(origin_y + placement.y),
                ],
            ),
        ];
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi_bytes(line), StringFormat::Literal)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        self.queue(page_index, operations);
        Ok(())
    }

    fn draw_rectangle(&mut self, page_index: u32, placement: &RectPlacement) -> Result<()> {
        let page_id = self.page_id(page_index)?;
        let (origin_x, origin_y) = self.origin(page_index)?;
        let color = placement.color;

        let mut operations = vec![Operation::new("q", vec![])];
        if placement.opacity < 1.0 {
            let (name, gs_id) = self.ensure_graphics_state(placement.opacity.max(0.0));
            self.register_resource(page_id, "ExtGState", &name, gs_id)?;
            operations.push(Operation::new(
                "gs",
                vec![Object::Name(name.into_bytes())],
            ));
        }
        operations.extend([
            Operation::new(
                "rg",
                vec![
                    Object::Real(color.r),
                    Object::Real(color.g),
                    Object::Real(color.b),
                ],
            ),
            Operation::new(
                "re",
                vec![
                    real(origin_x + placement.x),
                    real(origin_y + placement.y),
                    real(placement.width),
                    real(placement.height),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);

        self.queue(page_index, operations);
        Ok(())
    }

    fn save(mut self) -> Result<Vec<u8>> {
        self.flush()?;

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| AnnotateError::ExportFailed(e.to_string()))?;
        Ok(output)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn encode(operations: Vec<Operation>) -> Result<Vec<u8>> {
    Content { operations }
        .encode()
        .map_err(|e| AnnotateError::ExportFailed(e.to_string()))
}

/// Helvetica is set up with WinAnsiEncoding, which agrees with Latin-1
/// outside 0x80-0x9F. Everything else becomes '?'.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Result<[f64; 4]> {
    if array.len() != 4 {
        return Err(AnnotateError::InvalidDocument(
            "MediaBox must have 4 elements".to_string(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(AnnotateError::InvalidDocument(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}
