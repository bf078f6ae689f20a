//! File-to-text extraction.
//!
//! Converts raw file bytes into normalized text plus optional document
//! metadata, dispatching on the file name. Extraction never fails for a
//! malformed file: parse problems degrade to partial or empty text and the
//! pipeline simply produces fewer (or zero) chunks.

use crate::types::{DocumentMeta, ExtractedText};
use lopdf::{Document, Object};
use tracing::{debug, warn};

/// Extract normalized text and optional metadata from raw file bytes.
///
/// Dispatch is by file extension: `.pdf` gets page-by-page PDF extraction,
/// `.txt` is read as UTF-8, and anything else falls back to a UTF-8 read
/// (empty text if the bytes do not decode).
pub fn extract(file_name: &str, bytes: &[u8]) -> ExtractedText {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        extract_pdf(bytes)
    } else {
        extract_utf8(bytes)
    }
}

fn extract_utf8(bytes: &[u8]) -> ExtractedText {
    match std::str::from_utf8(bytes) {
        Ok(text) => ExtractedText {
            text: text.to_string(),
            meta: None,
        },
        Err(e) => {
            warn!("file is not valid UTF-8, treating as empty: {}", e);
            ExtractedText::empty()
        }
    }
}

/// Page-by-page PDF extraction. Per-page text is whitespace-normalized and
/// pages are joined with blank lines. Unreadable pages are skipped.
fn extract_pdf(bytes: &[u8]) -> ExtractedText {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("failed to parse PDF: {}", e);
            return ExtractedText::empty();
        }
    };

    let mut full = String::new();
    for (page_no, _object_id) in doc.get_pages() {
        match doc.extract_text(&[page_no]) {
            Ok(raw) => {
                let normalized = collapse_whitespace(&raw);
                if !normalized.is_empty() {
                    full.push_str(&normalized);
                    full.push_str("\n\n");
                }
            }
            Err(e) => {
                debug!("page {} has no extractable text: {}", page_no, e);
            }
        }
    }

    ExtractedText {
        text: full,
        meta: read_pdf_info(&doc),
    }
}

/// Read title/author from the PDF Info dictionary. Missing or unreadable
/// metadata is non-fatal.
fn read_pdf_info(doc: &Document) -> Option<DocumentMeta> {
    let info = doc.trailer.get(b"Info").ok()?;
    let dict = match info {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };

    let mut meta = DocumentMeta::new();
    for (key, field) in [(b"Title".as_slice(), "title"), (b"Author".as_slice(), "author")] {
        if let Ok(object) = dict.get(key)
            && let Some(value) = pdf_text_string(object)
            && !value.is_empty()
        {
            meta.insert(field.to_string(), value);
        }
    }

    if meta.is_empty() { None } else { Some(meta) }
}

/// Decode a PDF text string object. Strings are UTF-16BE when they carry a
/// BOM, byte-encoded otherwise.
fn pdf_text_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _format) = object else {
        return None;
    };

    let decoded = if bytes.starts_with(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    Some(decoded.trim().to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
