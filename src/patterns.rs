//! Stateless regex pattern extraction for author and publisher candidates.
//!
//! Scans raw page text with an ordered list of independent patterns per
//! kind. Every match is considered, and for multi-group patterns every
//! capturing group is inspected. Candidates are validated, cleaned, and
//! deduplicated by exact string with first-seen order preserved.
//!
//! Selection policy: the most frequently repeated candidate wins; ties go
//! to the candidate seen first. A name repeated on the cover, title page,
//! and copyright page is a stronger signal than a one-off match.

use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::{CandidateKind, ExtractedCandidate};

/// Name-shaped fragment: two capitalized words with an optional middle
/// initial ("Jane Doe", "John Q. Public").
const NAME: &str = r"[A-Z][A-Za-z]+(?:\s+[A-Z]\.?)?\s+[A-Z][A-Za-z]+";

const AUTHOR_BLOCKLIST: [&str; 7] = [
    "unknown",
    "anonymous",
    "various",
    "university",
    "institute",
    "company",
    "corporation",
];

const PUBLISHER_BLOCKLIST: [&str; 6] = [
    "unknown",
    "unknown publisher",
    "author",
    "page",
    "chapter",
    "section",
];

/// Compiled pattern lists for both candidate kinds. Construct once and
/// share; extraction itself is stateless.
pub struct PatternExtractor {
    author_patterns: Vec<(&'static str, Regex)>,
    publisher_patterns: Vec<(&'static str, Regex)>,
}

/// Candidate lists for one text window, with occurrence counts retained
/// for best-candidate selection.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub authors: Vec<ExtractedCandidate>,
    pub publishers: Vec<ExtractedCandidate>,
    author_counts: HashMap<String, usize>,
    publisher_counts: HashMap<String, usize>,
}

impl Candidates {
    /// The selected author per the documented policy, if any candidate
    /// survived validation.
    pub fn best_author(&self) -> Option<&str> {
        best_of(&self.authors, &self.author_counts)
    }

    /// The selected publisher per the documented policy.
    pub fn best_publisher(&self) -> Option<&str> {
        best_of(&self.publishers, &self.publisher_counts)
    }
}

/// Most-frequent-first selection; `ordered` is deduplicated in first-seen
/// order, so a strict `>` comparison breaks ties toward earlier candidates.
fn best_of<'a>(
    ordered: &'a [ExtractedCandidate],
    counts: &HashMap<String, usize>,
) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for candidate in ordered {
        let n = counts.get(&candidate.text).copied().unwrap_or(0);
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((candidate.text.as_str(), n));
        }
    }
    best.map(|(text, _)| text)
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        let author_patterns = vec![
            (
                "by-line",
                Regex::new(&format!(r"\b[Bb]y\s+({NAME})(?:\s+and\s+({NAME}))?")).unwrap(),
            ),
            (
                "author-label",
                Regex::new(&format!(
                    r"[Aa]uthors?\s*[:\-]\s*({NAME})(?:\s*(?:,|and)\s+({NAME}))?"
                ))
                .unwrap(),
            ),
            (
                "copyright-holder",
                Regex::new(&format!(
                    r"(?:©|\([Cc]\)|[Cc]opyright)\s*\d{{4}}\s+(?:by\s+)?({NAME})"
                ))
                .unwrap(),
            ),
        ];

        let publisher_patterns = vec![
            (
                "published-by",
                Regex::new(r"[Pp]ublished\s+by\s+([A-Z][A-Za-z&\s]{2,60}?)(?:\s+\d{4}|[,.;\n]|$)")
                    .unwrap(),
            ),
            (
                "publisher-label",
                Regex::new(r"[Pp]ublisher\s*[:\-]\s*([A-Z][A-Za-z&\s]{2,60}?)(?:[,.;\n]|$)")
                    .unwrap(),
            ),
            (
                "copyright-imprint",
                Regex::new(
                    r"(?:©|\([Cc]\)|[Cc]opyright)\s*\d{4}\s+([A-Z][A-Za-z&\s]*?(?:Press|Publishing|Publications|Books|Media))",
                )
                .unwrap(),
            ),
        ];

        Self {
            author_patterns,
            publisher_patterns,
        }
    }

    /// Scans `text` for author and publisher candidates. Absence of
    /// matches yields empty lists; this never fails for string input.
    pub fn extract_candidates(&self, text: &str) -> Candidates {
        let mut out = Candidates::default();
        collect(
            &self.author_patterns,
            text,
            CandidateKind::Author,
            clean_author,
            is_valid_author,
            &mut out.authors,
            &mut out.author_counts,
        );
        collect(
            &self.publisher_patterns,
            text,
            CandidateKind::Publisher,
            clean_publisher,
            is_valid_publisher,
            &mut out.publishers,
            &mut out.publisher_counts,
        );
        out
    }
}

#[allow(clippy::too_many_arguments)]
fn collect(
    patterns: &[(&'static str, Regex)],
    text: &str,
    kind: CandidateKind,
    clean: fn(&str) -> String,
    validate: fn(&str) -> bool,
    ordered: &mut Vec<ExtractedCandidate>,
    counts: &mut HashMap<String, usize>,
) {
    let mut seen: HashSet<String> = HashSet::new();
    for (pattern_id, re) in patterns {
        for caps in re.captures_iter(text) {
            for group in caps.iter().skip(1).flatten() {
                let cleaned = clean(group.as_str());
                if !validate(&cleaned) {
                    continue;
                }
                *counts.entry(cleaned.clone()).or_insert(0) += 1;
                if seen.insert(cleaned.clone()) {
                    ordered.push(ExtractedCandidate {
                        kind,
                        text: cleaned,
                        pattern_id: (*pattern_id).to_string(),
                    });
                }
            }
        }
    }
}

/// Strips everything outside basic Latin letters and whitespace, then
/// collapses runs of whitespace.
fn clean_author(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_valid_author(cleaned: &str) -> bool {
    if cleaned.len() <= 5 {
        return false;
    }
    let capitalized = cleaned
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
        .count();
    if capitalized < 2 {
        return false;
    }
    let lower = cleaned.to_lowercase();
    !AUTHOR_BLOCKLIST.iter().any(|term| lower.contains(term))
}

/// Strips everything outside letters, ampersand, and whitespace.
fn clean_publisher(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '&' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_valid_publisher(cleaned: &str) -> bool {
    if cleaned.len() <= 3 {
        return false;
    }
    let lower = cleaned.to_lowercase();
    !PUBLISHER_BLOCKLIST.iter().any(|term| lower.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PatternExtractor {
        PatternExtractor::new()
    }

    #[test]
    fn by_line_yields_author() {
        let c = extractor().extract_candidates("A study of things, by Jane Doe, 2019.");
        assert!(c.authors.iter().any(|a| a.text == "Jane Doe"));
    }

    #[test]
    fn blocklist_excluded_regardless_of_case() {
        let c = extractor().extract_candidates("Written by UNKNOWN AUTHOR and by Various People");
        assert!(c.authors.is_empty(), "got: {:?}", c.authors);
    }

    #[test]
    fn no_matches_yields_empty_lists() {
        let c = extractor().extract_candidates("lowercase text with no patterns at all");
        assert!(c.authors.is_empty());
        assert!(c.publishers.is_empty());
        assert!(c.best_author().is_none());
    }

    #[test]
    fn multi_group_pattern_captures_both_names() {
        let c = extractor()
            .extract_candidates("Research by John Smith and Mary Jones, University of Example");
        let names: Vec<&str> = c.authors.iter().map(|a| a.text.as_str()).collect();
        assert!(names.contains(&"John Smith"), "got: {:?}", names);
        assert!(names.contains(&"Mary Jones"), "got: {:?}", names);
        // University of Example must not survive the blocklist
        assert!(!names.iter().any(|n| n.contains("University")));
    }

    #[test]
    fn published_by_yields_publisher() {
        let c = extractor().extract_candidates("Published by Acme Press 2020");
        let names: Vec<&str> = c.publishers.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(names, vec!["Acme Press"]);
    }

    #[test]
    fn selection_prefers_most_frequent() {
        let text = "by Alice Ames. Later, by Bob Brown. Copyright 2021 Bob Brown.";
        let c = extractor().extract_candidates(text);
        // Bob Brown appears twice, Alice Ames once.
        assert_eq!(c.best_author(), Some("Bob Brown"));
    }

    #[test]
    fn selection_ties_break_to_first_seen() {
        let c = extractor().extract_candidates("by Alice Ames and Bob Brown");
        assert_eq!(c.best_author(), Some("Alice Ames"));
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let text = "by Carol Cole. Also by Dan Drew. And again by Carol Cole.";
        let c = extractor().extract_candidates(text);
        let names: Vec<&str> = c.authors.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(names, vec!["Carol Cole", "Dan Drew"]);
    }

    #[test]
    fn author_cleaning_strips_non_latin() {
        assert_eq!(clean_author("  Jane   Doe, Ph.D. (ed.)"), "Jane Doe PhD ed");
        assert!(is_valid_author("Jane Doe"));
        assert!(!is_valid_author("jane doe"));
        assert!(!is_valid_author("J D"));
    }

    #[test]
    fn publisher_cleaning_keeps_ampersand() {
        assert_eq!(clean_publisher("Smith & Sons, Ltd."), "Smith & Sons Ltd");
        assert!(is_valid_publisher("Smith & Sons"));
        assert!(!is_valid_publisher("Ltd"));
        assert!(!is_valid_publisher("Unknown Publisher"));
    }
}
