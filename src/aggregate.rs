//! Metadata aggregation: merges embedded PDF metadata with text-pattern
//! extraction into a [`ResolvedMetadata`] record with per-field provenance.
//!
//! The embedded Info dictionary wins when it has a real value; pattern
//! extraction fills the gaps. Publishers are always text-derived since the
//! PDF core metadata set has no publisher field. Aggregation itself never
//! fails for well-formed text; only container-level extractor errors
//! propagate.

use regex::Regex;
use std::path::Path;

use crate::extract::{self, ExtractError};
use crate::models::{is_placeholder, ResolvedMetadata, UNKNOWN};
use crate::patterns::PatternExtractor;

pub struct MetadataAggregator {
    extractor: PatternExtractor,
    max_pages: usize,
    copyright_re: Regex,
    isbn_re: Regex,
    doi_re: Regex,
    keywords_re: Regex,
    abstract_re: Regex,
}

/// Abstract paragraphs outside this window are noise (a heading match or a
/// full page of body text).
const ABSTRACT_MIN: usize = 50;
const ABSTRACT_MAX: usize = 500;

impl MetadataAggregator {
    pub fn new(max_pages: usize) -> Self {
        Self {
            extractor: PatternExtractor::new(),
            max_pages,
            copyright_re: Regex::new(r"(?i)(?:©|\(c\)|copyright)\s*(\d{4})").unwrap(),
            isbn_re: Regex::new(
                r"(?i)\bISBN(?:-1[03])?[:\s]*((?:97[89][-\s]?)?\d{1,5}[-\s]?\d{1,7}[-\s]?\d{1,7}[-\s]?[\dXx])",
            )
            .unwrap(),
            doi_re: Regex::new(r"\b(10\.\d{4,9}/[-._;()/:A-Za-z0-9]+)").unwrap(),
            keywords_re: Regex::new(r"(?i)\bkeywords?\s*[:\-]\s*([^\n]+)").unwrap(),
            abstract_re: Regex::new(
                r"(?is)\babstract\b\s*[:.\-]?\s*(.+?)(?:\n\s*\n|\n\s*(?:keywords|introduction|1\.?\s+introduction)|$)",
            )
            .unwrap(),
        }
    }

    /// Produces the resolved record for the PDF at `path`.
    pub fn aggregate(&self, path: &Path) -> Result<ResolvedMetadata, ExtractError> {
        let doc = extract::load_document(path)?;
        let raw = extract::embedded_metadata(&doc);
        let pages = extract::pages_text(&doc, self.max_pages);
        let candidates = self.extractor.extract_candidates(&pages.text);

        let (author, author_found_in_metadata) = if is_placeholder(&raw.author) {
            (
                candidates
                    .best_author()
                    .unwrap_or(UNKNOWN)
                    .to_string(),
                false,
            )
        } else {
            (raw.author.clone(), true)
        };

        // PDF core metadata has no publisher field, so this is always a
        // text-extraction attempt.
        let publisher = candidates
            .best_publisher()
            .unwrap_or(UNKNOWN)
            .to_string();

        Ok(ResolvedMetadata {
            title: raw.title,
            author,
            author_found_in_metadata,
            publisher,
            publisher_found_in_metadata: false,
            page_count: raw.page_count,
            creation_date: raw.creation_date,
            creator: raw.creator,
            producer: raw.producer,
            copyright_year: self.copyright_year(&pages.text),
            isbn: self.first_group(&self.isbn_re, &pages.text),
            doi: self.first_group(&self.doi_re, &pages.text),
            keywords: self
                .first_group(&self.keywords_re, &pages.text)
                .map(|k| k.trim().to_string()),
            abstract_text: self.abstract_paragraph(&pages.text),
            author_candidates: candidates.authors.clone(),
            publisher_candidates: candidates.publishers.clone(),
            pages_extracted: pages.pages_extracted,
            pages_attempted: pages.pages_attempted,
        })
    }

    fn copyright_year(&self, text: &str) -> Option<u16> {
        self.copyright_re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u16>().ok())
    }

    fn first_group(&self, re: &Regex, text: &str) -> Option<String> {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn abstract_paragraph(&self, text: &str) -> Option<String> {
        let para = self
            .abstract_re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())?;
        if (ABSTRACT_MIN..=ABSTRACT_MAX).contains(&para.len()) {
            Some(para)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::build_pdf;

    #[test]
    fn embedded_author_wins_publisher_from_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.pdf");
        build_pdf(
            &path,
            Some("Jane Doe"),
            &["Published by Acme Press 2020"],
        );

        let meta = MetadataAggregator::new(3).aggregate(&path).unwrap();
        assert_eq!(meta.author, "Jane Doe");
        assert!(meta.author_found_in_metadata);
        assert_eq!(meta.publisher, "Acme Press");
        assert!(!meta.publisher_found_in_metadata);
        assert_eq!(meta.page_count, 1);
    }

    #[test]
    fn missing_embedded_author_falls_back_to_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.pdf");
        build_pdf(&path, None, &["A report by John Smith, 2021"]);

        let meta = MetadataAggregator::new(3).aggregate(&path).unwrap();
        assert_eq!(meta.author, "John Smith");
        assert!(!meta.author_found_in_metadata);
    }

    #[test]
    fn nothing_found_yields_placeholders_not_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.pdf");
        build_pdf(&path, None, &["plain body text with nothing to find"]);

        let meta = MetadataAggregator::new(3).aggregate(&path).unwrap();
        assert_eq!(meta.author, UNKNOWN);
        assert_eq!(meta.publisher, UNKNOWN);
        assert_eq!(meta.title, UNKNOWN);
        assert!(meta.copyright_year.is_none());
        assert!(meta.isbn.is_none());
    }

    #[test]
    fn auxiliary_fields_extracted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.pdf");
        build_pdf(
            &path,
            Some("Jane Doe"),
            &[
                "Copyright 2020 Acme Press",
                "ISBN: 978-0-12-345678-9",
                "DOI: 10.1234/abc.def-1",
                "Keywords: rust, pdf, metadata",
            ],
        );

        let meta = MetadataAggregator::new(3).aggregate(&path).unwrap();
        assert_eq!(meta.copyright_year, Some(2020));
        assert_eq!(meta.isbn.as_deref(), Some("978-0-12-345678-9"));
        assert_eq!(meta.doi.as_deref(), Some("10.1234/abc.def-1"));
        assert_eq!(meta.keywords.as_deref(), Some("rust, pdf, metadata"));
    }

    const ABSTRACT_BODY: &str = "This study examines how bibliographic metadata \
can be inferred from the opening pages of scholarly documents.";

    #[test]
    fn abstract_extracted_from_page_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.pdf");
        build_pdf(&path, None, &[&format!("Abstract: {}", ABSTRACT_BODY)]);

        let meta = MetadataAggregator::new(3).aggregate(&path).unwrap();
        assert_eq!(meta.abstract_text.as_deref(), Some(ABSTRACT_BODY));
    }

    #[test]
    fn abstract_paragraph_respects_bounds() {
        let agg = MetadataAggregator::new(3);

        // In bounds, terminated by the blank line before the next section.
        let text = format!("Abstract: {}\n\nIntroduction\nBody text.", ABSTRACT_BODY);
        assert_eq!(agg.abstract_paragraph(&text).as_deref(), Some(ABSTRACT_BODY));

        // A bare heading match is too short to be a real abstract.
        assert!(agg.abstract_paragraph("Abstract\n\nMethods").is_none());

        // A capture spanning a full page of body text is noise.
        let long = format!("Abstract: {}", "lorem ipsum ".repeat(60));
        assert!(agg.abstract_paragraph(&long).is_none());
    }

    #[test]
    fn nonexistent_path_propagates_not_found() {
        let err = MetadataAggregator::new(3)
            .aggregate(Path::new("/no/such/doc.pdf"))
            .unwrap_err();
        assert!(err.to_string().to_lowercase().contains("not found"));
    }
}
