//! Core data models used throughout bibcast.
//!
//! These types represent the documents, candidates, and resolved metadata
//! records that flow through the extraction and aggregation pipeline.

use serde::{Deserialize, Serialize};

/// Placeholder used for absent metadata values. Downstream display code
/// relies on fields being present with this literal, never empty or null.
pub const UNKNOWN: &str = "Unknown";

/// Returns true if a metadata value should be treated as absent.
pub fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty() || value.trim().eq_ignore_ascii_case(UNKNOWN)
}

/// A PDF discovered in the document pool by a directory scan.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    /// Absolute path to the PDF file.
    pub path: String,
    /// File name without directory components.
    pub file_name: String,
    /// Size in bytes at scan time.
    pub file_size: u64,
    /// Last-modified timestamp (unix seconds), 0 if unavailable.
    pub modified: i64,
}

/// Embedded PDF metadata (the document's Info dictionary), extracted once
/// per document and read-only afterward. Missing fields hold `"Unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMetadata {
    pub title: String,
    pub author: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: String,
    pub modification_date: String,
    pub page_count: usize,
}

impl Default for RawMetadata {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            creator: UNKNOWN.to_string(),
            producer: UNKNOWN.to_string(),
            creation_date: UNKNOWN.to_string(),
            modification_date: UNKNOWN.to_string(),
            page_count: 0,
        }
    }
}

/// Kind of a pattern-extracted candidate string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Author,
    Publisher,
}

/// A candidate string proposed by the pattern extractor from a text window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedCandidate {
    pub kind: CandidateKind,
    pub text: String,
    /// Identifier of the regex pattern that produced this candidate.
    pub pattern_id: String,
}

/// Final bibliographic record: embedded metadata overridden field-by-field
/// by pattern-extraction results, with per-field provenance.
///
/// Invariant: `author`, `publisher`, and `title` are always non-empty
/// (the placeholder `"Unknown"` when nothing was found), and each
/// provenance flag reflects which source actually supplied the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub author: String,
    /// True when `author` came from the embedded Info dictionary rather
    /// than text-pattern extraction.
    pub author_found_in_metadata: bool,
    pub publisher: String,
    /// True when `publisher` came from embedded metadata. PDF core
    /// metadata has no publisher field, so this is effectively always
    /// false; kept for symmetry and auditability.
    pub publisher_found_in_metadata: bool,
    pub page_count: usize,
    pub creation_date: String,
    pub creator: String,
    pub producer: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    /// Full candidate lists, kept for auditability.
    pub author_candidates: Vec<ExtractedCandidate>,
    pub publisher_candidates: Vec<ExtractedCandidate>,

    /// Pages whose text extraction succeeded, out of `pages_attempted`.
    /// A low ratio usually means scanned/image-only pages.
    pub pages_extracted: usize,
    pub pages_attempted: usize,
}
