//! Document loading and page geometry.
//!
//! lopdf parses the whole file into memory. Parsing is CPU-bound, so the
//! async entry point moves it onto the blocking pool. Page boxes come from
//! each page's `/MediaBox`, walking up the page tree for inherited values.

use crate::error::StampError;
use crate::geometry::PageBox;
use crate::output::DocumentMetadata;
use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum `/Parent` hops when looking for an inherited attribute.
const MAX_TREE_DEPTH: usize = 32;

/// Parse PDF bytes on the blocking pool.
pub async fn load_document(path: &Path, bytes: Vec<u8>) -> Result<Document, StampError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || load_document_blocking(&path, &bytes))
        .await
        .map_err(|e| StampError::Internal(format!("Load task panicked: {}", e)))?
}

/// Blocking implementation of [`load_document`].
pub fn load_document_blocking(path: &Path, bytes: &[u8]) -> Result<Document, StampError> {
    let doc = parse_document(path, bytes)?;

    if doc.is_encrypted() {
        return Err(StampError::Encrypted {
            path: path.to_path_buf(),
        });
    }

    info!("PDF loaded: {} pages, version {}", doc.get_pages().len(), doc.version);
    Ok(doc)
}

/// Parse without rejecting encrypted files; for read-only inspection.
pub fn parse_document(path: &Path, bytes: &[u8]) -> Result<Document, StampError> {
    Document::load_mem(bytes).map_err(|e| StampError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Page object ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Box of every page, in page order.
pub fn page_boxes(doc: &Document) -> Vec<PageBox> {
    page_ids(doc)
        .into_iter()
        .map(|id| page_box(doc, id))
        .collect()
}

/// The page's MediaBox, inherited if needed; US Letter when absent.
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let found = inherited(doc, page_id, b"MediaBox").and_then(|obj| rect_of(doc, obj));
    match found {
        Some(rect) => PageBox::from_rect(rect),
        None => {
            debug!("Page {:?} has no usable MediaBox; assuming US Letter", page_id);
            PageBox::LETTER
        }
    }
}

/// Look up `key` on the page dictionary or its ancestors.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn rect_of(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, value) in rect.iter_mut().zip(arr) {
        let value = match value {
            Object::Reference(id) => doc.get_object(*id).ok()?,
            other => other,
        };
        *slot = value.as_float().ok()?;
    }
    Some(rect)
}

/// Collect metadata without touching page content.
pub fn extract_metadata(doc: &Document) -> DocumentMetadata {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        });

    let get = |key: &[u8]| -> Option<String> {
        let value = info?.get(key).ok()?;
        let value = match value {
            Object::Reference(id) => doc.get_object(*id).ok()?,
            other => other,
        };
        match value {
            Object::String(bytes, _) => {
                let s = decode_text_string(bytes);
                (!s.trim().is_empty()).then_some(s)
            }
            _ => None,
        }
    };

    let pages = page_boxes(doc);
    DocumentMetadata {
        title: get(b"Title"),
        author: get(b"Author"),
        subject: get(b"Subject"),
        creator: get(b"Creator"),
        producer: get(b"Producer"),
        page_count: pages.len(),
        pdf_version: doc.version.clone(),
        is_encrypted: doc.is_encrypted(),
        pages,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise byte-per-char.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xfe && bytes[1] == 0xff {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Describe a path for error messages when the input came from memory.
pub fn memory_path() -> PathBuf {
    PathBuf::from("<memory>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn doc_with_pages(boxes: &[Option<Vec<Object>>], inherited_box: Option<Vec<Object>>) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = boxes
            .iter()
            .map(|media_box| {
                let mut page = dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                };
                if let Some(b) = media_box {
                    page.set("MediaBox", b.clone());
                }
                doc.add_object(page).into()
            })
            .collect();
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        if let Some(b) = inherited_box {
            pages.set("MediaBox", b);
        }
        doc.objects.insert(pages_id, pages.into());
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    fn rect(v: [f32; 4]) -> Vec<Object> {
        v.iter().map(|&f| Object::Real(f)).collect()
    }

    #[test]
    fn page_boxes_direct_inherited_and_default() {
        let doc = doc_with_pages(
            &[Some(rect([0.0, 0.0, 595.0, 842.0])), None],
            Some(rect([0.0, 0.0, 300.0, 400.0])),
        );
        let boxes = page_boxes(&doc);
        assert_eq!(boxes.len(), 2);
        assert_eq!((boxes[0].width, boxes[0].height), (595.0, 842.0));
        assert_eq!((boxes[1].width, boxes[1].height), (300.0, 400.0));

        let bare = doc_with_pages(&[None], None);
        assert_eq!(page_boxes(&bare), vec![PageBox::LETTER]);
    }

    #[test]
    fn integer_media_box() {
        let doc = doc_with_pages(&[Some(vec![0.into(), 0.into(), 612.into(), 1008.into()])], None);
        assert_eq!(page_boxes(&doc)[0].height, 1008.0);
    }

    #[test]
    fn metadata_reads_info_dictionary() {
        let mut doc = doc_with_pages(&[Some(rect([0.0, 0.0, 612.0, 792.0]))], None);
        let info = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Lease Agreement"),
            "Author" => Object::String(vec![0xfe, 0xff, 0x00, 0x4a, 0x00, 0xf6], lopdf::StringFormat::Hexadecimal),
            "Subject" => Object::string_literal("  "),
        });
        doc.trailer.set("Info", info);

        let meta = extract_metadata(&doc);
        assert_eq!(meta.title.as_deref(), Some("Lease Agreement"));
        assert_eq!(meta.author.as_deref(), Some("Jö"));
        assert_eq!(meta.subject, None);
        assert_eq!(meta.page_count, 1);
        assert_eq!(meta.pdf_version, "1.7");
        assert!(!meta.is_encrypted);
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = load_document_blocking(Path::new("x.pdf"), b"%PDF-1.7 nonsense").unwrap_err();
        assert!(matches!(err, StampError::CorruptPdf { .. }));
    }
}
