//! PDF text and embedded-metadata extraction.
//!
//! Extraction is best-effort by design: individual pages that fail text
//! extraction (commonly scanned/image-only pages) are skipped silently and
//! only counted, never surfaced as errors. Whole-container failures are
//! reported through [`ExtractError`].

use std::path::Path;

use crate::models::{RawMetadata, UNKNOWN};

/// Extraction error. Per-page failures are not errors; only a missing or
/// unparseable container reaches the caller.
#[derive(Debug)]
pub enum ExtractError {
    /// The path does not resolve to a file at call time.
    NotFound(String),
    /// The PDF container cannot be opened at all (corrupt, encrypted).
    Unreadable(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::NotFound(path) => write!(f, "PDF file not found: {}", path),
            ExtractError::Unreadable(e) => write!(f, "PDF unreadable: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Concatenated page text plus extraction counts, so callers can gauge
/// how much of the document actually yielded text.
#[derive(Debug, Clone)]
pub struct PageText {
    pub text: String,
    pub pages_extracted: usize,
    pub pages_attempted: usize,
}

/// Opens a PDF container, mapping failures to the error taxonomy.
pub fn load_document(path: &Path) -> Result<lopdf::Document, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::NotFound(path.display().to_string()));
    }
    let doc = lopdf::Document::load(path).map_err(|e| ExtractError::Unreadable(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(ExtractError::Unreadable(format!(
            "{} is encrypted",
            path.display()
        )));
    }
    Ok(doc)
}

/// Extracts plain text from up to `max_pages` pages of an already-loaded
/// document. Pages whose extraction fails are skipped, not retried.
pub fn pages_text(doc: &lopdf::Document, max_pages: usize) -> PageText {
    let mut parts: Vec<String> = Vec::new();
    let mut attempted = 0usize;
    for page_number in doc.get_pages().keys().take(max_pages) {
        attempted += 1;
        match doc.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => parts.push(text),
            _ => {}
        }
    }
    PageText {
        pages_extracted: parts.len(),
        pages_attempted: attempted,
        text: parts.join("\n\n"),
    }
}

/// Reads the Info dictionary of an already-loaded document, normalized to
/// a fixed key set with `"Unknown"` for anything absent.
pub fn embedded_metadata(doc: &lopdf::Document) -> RawMetadata {
    let mut meta = RawMetadata {
        page_count: doc.get_pages().len(),
        ..RawMetadata::default()
    };

    let info = match doc
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| doc.get_dictionary(id))
    {
        Ok(dict) => dict,
        Err(_) => return meta,
    };

    meta.title = info_string(info, b"Title").unwrap_or_else(|| UNKNOWN.to_string());
    meta.author = info_string(info, b"Author").unwrap_or_else(|| UNKNOWN.to_string());
    meta.creator = info_string(info, b"Creator").unwrap_or_else(|| UNKNOWN.to_string());
    meta.producer = info_string(info, b"Producer").unwrap_or_else(|| UNKNOWN.to_string());
    meta.creation_date = info_string(info, b"CreationDate").unwrap_or_else(|| UNKNOWN.to_string());
    meta.modification_date = info_string(info, b"ModDate").unwrap_or_else(|| UNKNOWN.to_string());
    meta
}

/// Contract entry point: up to `max_pages` pages of text from the PDF at
/// `path`, blank-line separated.
pub fn extract_pages_text(path: &Path, max_pages: usize) -> Result<PageText, ExtractError> {
    let doc = load_document(path)?;
    Ok(pages_text(&doc, max_pages))
}

/// Contract entry point: embedded metadata for the PDF at `path`.
pub fn extract_embedded_metadata(path: &Path) -> Result<RawMetadata, ExtractError> {
    let doc = load_document(path)?;
    Ok(embedded_metadata(&doc))
}

fn info_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let obj = dict.get(key).ok()?;
    let bytes = match obj {
        lopdf::Object::String(bytes, _) => bytes.as_slice(),
        lopdf::Object::Name(bytes) => bytes.as_slice(),
        _ => return None,
    };
    let decoded = decode_text_string(bytes);
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// PDF text strings are UTF-16BE when they carry a BOM, otherwise
/// PDFDocEncoding (treated as Latin-1 here, which covers the common range).
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
