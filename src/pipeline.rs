//! Staged pipeline runner: select → analyze → research → script →
//! recording → editing → finalize.
//!
//! Each stage consumes the accumulated [`PipelineState`], adds only the
//! fields it owns, and never removes a prior stage's fields. A state
//! carrying `error` short-circuits every downstream stage: the stage
//! returns the state untouched with an "upstream failure" status and must
//! not do any work, in particular no backend calls.
//!
//! Stage results are cached under (stage-name, document-fingerprint). The
//! cache is consulted only when the stage's optional instruction is
//! empty; a non-empty instruction bypasses the lookup and the fresh
//! result is written back afterward regardless.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::aggregate::MetadataAggregator;
use crate::backend::TextGenerator;
use crate::cache::{content_fingerprint, path_fingerprint, ResultCache};
use crate::config::Config;
use crate::models::ResolvedMetadata;

pub const STAGE_SELECT: &str = "select";
pub const STAGE_ANALYZE: &str = "analyze";
pub const STAGE_RESEARCH: &str = "research";
pub const STAGE_SCRIPT: &str = "script";
pub const STAGE_RECORDING: &str = "recording";
pub const STAGE_EDITING: &str = "editing";
pub const STAGE_FINALIZE: &str = "finalize";

/// Speaking rate used for segment duration estimates.
const WORDS_PER_MINUTE: u64 = 150;

/// One planned segment of the recording, derived from the script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptSegment {
    pub index: usize,
    pub text: String,
    pub estimated_secs: u64,
}

/// The accumulating record threaded across stages. Every field is owned
/// by exactly one stage; `error` is shared and fatal to downstream work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineState {
    // select
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    // analyze
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResolvedMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_date: Option<String>,

    // research
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_notes: Option<String>,

    // script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    // recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_plan: Option<Vec<ScriptSegment>>,

    // editing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_summary: Option<String>,

    // finalize
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fatal document-level failure; short-circuits downstream stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineState {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

enum Entry {
    /// Stage is done without doing work (short-circuit or cache hit).
    Done(PipelineState, String),
    /// Run the stage; fingerprint precomputed, path extracted.
    Fresh { fingerprint: String, path: String },
}

/// The pipeline service: owns its cache, aggregator, and backend handle.
/// Constructor-injected so callers can hold independent instances.
pub struct Pipeline {
    aggregator: MetadataAggregator,
    backend: Arc<dyn TextGenerator>,
    cache: ResultCache<PipelineState>,
    content_fingerprints: bool,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        backend: Arc<dyn TextGenerator>,
        cache: ResultCache<PipelineState>,
    ) -> Self {
        Self {
            aggregator: MetadataAggregator::new(config.extraction.max_pages),
            backend,
            cache,
            content_fingerprints: config.cache.fingerprint == "content",
        }
    }

    /// Convenience constructor building the cache from config.
    pub fn from_config(config: &Config, backend: Arc<dyn TextGenerator>) -> Self {
        let cache = ResultCache::new(config.cache.ttl_secs);
        Self::new(config, backend, cache)
    }

    fn fingerprint(&self, path: &str) -> String {
        if self.content_fingerprints {
            // fall back to the path digest when the file cannot be read
            content_fingerprint(Path::new(path))
                .unwrap_or_else(|_| path_fingerprint(Path::new(path)))
        } else {
            path_fingerprint(Path::new(path))
        }
    }

    /// Common stage entry: short-circuit on upstream error, reject states
    /// with no selected document, then consult the cache unless an
    /// instruction demands fresh processing.
    fn enter(&self, stage: &str, state: &PipelineState, instruction: Option<&str>) -> Entry {
        if let Some(err) = &state.error {
            return Entry::Done(
                state.clone(),
                format!("{}: skipped (upstream failure: {})", stage, err),
            );
        }
        let Some(path) = state.pdf_path.clone() else {
            let mut next = state.clone();
            next.error = Some("no valid PDF data provided".to_string());
            return Entry::Done(next, format!("{}: no document selected", stage));
        };
        let fingerprint = self.fingerprint(&path);
        if instruction.map_or(true, |i| i.trim().is_empty()) {
            if let Some(cached) = self.cache.get(stage, &fingerprint) {
                return Entry::Done(cached, format!("{}: loaded from cache", stage));
            }
        }
        Entry::Fresh { fingerprint, path }
    }

    /// Wraps a backend call, embedding failures as a string in the owning
    /// field rather than letting them cross the stage boundary.
    async fn generate_or_error(&self, prompt: &str) -> String {
        match self.backend.generate(prompt).await {
            Ok(text) => text,
            Err(e) => format!("General AI Error: {}", e),
        }
    }

    /// Stage 1: record the selected document's identity and size. A
    /// missing path is a document-level error, recoverable by retrying
    /// with a different selection.
    pub async fn select(&self, pdf_path: &str) -> (PipelineState, String) {
        let fingerprint = self.fingerprint(pdf_path);
        if let Some(cached) = self.cache.get(STAGE_SELECT, &fingerprint) {
            return (cached, format!("{}: loaded from cache", STAGE_SELECT));
        }

        let path = Path::new(pdf_path);
        if !path.is_file() {
            let state = PipelineState {
                error: Some(format!("PDF file not found: {}", pdf_path)),
                ..Default::default()
            };
            return (state, format!("{}: PDF not found", STAGE_SELECT));
        }

        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let state = PipelineState {
            pdf_path: Some(pdf_path.to_string()),
            pdf_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            file_size: Some(file_size),
            status: Some("selected".to_string()),
            ..Default::default()
        };
        self.cache.put(STAGE_SELECT, &fingerprint, state.clone());
        (state, format!("{}: ok", STAGE_SELECT))
    }

    /// Stage 2: run the metadata aggregator and stamp the analysis time.
    pub async fn analyze(
        &self,
        state: PipelineState,
        instruction: Option<&str>,
    ) -> (PipelineState, String) {
        let (fingerprint, path) = match self.enter(STAGE_ANALYZE, &state, instruction) {
            Entry::Done(state, status) => return (state, status),
            Entry::Fresh { fingerprint, path } => (fingerprint, path),
        };

        match self.aggregator.aggregate(Path::new(&path)) {
            Ok(metadata) => {
                let mut next = state;
                next.metadata = Some(metadata);
                next.analysis_date = Some(Utc::now().to_rfc3339());
                next.status = Some("analyzed".to_string());
                self.cache.put(STAGE_ANALYZE, &fingerprint, next.clone());
                (next, format!("{}: ok", STAGE_ANALYZE))
            }
            Err(e) => {
                let mut next = state;
                next.error = Some(format!("PDF analysis failed: {}", e));
                (next, format!("{}: {}", STAGE_ANALYZE, e))
            }
        }
    }

    /// Stage 3: background research from the backend. Backend failures
    /// land in `research_notes` as an error string; the pipeline goes on.
    pub async fn research(
        &self,
        state: PipelineState,
        instruction: Option<&str>,
    ) -> (PipelineState, String) {
        let (fingerprint, _path) = match self.enter(STAGE_RESEARCH, &state, instruction) {
            Entry::Done(state, status) => return (state, status),
            Entry::Fresh { fingerprint, path } => (fingerprint, path),
        };

        let prompt = research_prompt(&state, instruction);
        let notes = self.generate_or_error(&prompt).await;
        let mut next = state;
        next.research_notes = Some(notes);
        self.cache.put(STAGE_RESEARCH, &fingerprint, next.clone());
        (next, format!("{}: ok", STAGE_RESEARCH))
    }

    /// Stage 4: podcast script from the backend.
    pub async fn script(
        &self,
        state: PipelineState,
        instruction: Option<&str>,
    ) -> (PipelineState, String) {
        let (fingerprint, _path) = match self.enter(STAGE_SCRIPT, &state, instruction) {
            Entry::Done(state, status) => return (state, status),
            Entry::Fresh { fingerprint, path } => (fingerprint, path),
        };

        let prompt = script_prompt(&state, instruction);
        let script = self.generate_or_error(&prompt).await;
        let mut next = state;
        next.script = Some(script);
        self.cache.put(STAGE_SCRIPT, &fingerprint, next.clone());
        (next, format!("{}: ok", STAGE_SCRIPT))
    }

    /// Stage 5: derive a segment plan from the script. Audio generation
    /// is out of scope; this is a pure data transform.
    pub async fn recording(
        &self,
        state: PipelineState,
        instruction: Option<&str>,
    ) -> (PipelineState, String) {
        let (fingerprint, _path) = match self.enter(STAGE_RECORDING, &state, instruction) {
            Entry::Done(state, status) => return (state, status),
            Entry::Fresh { fingerprint, path } => (fingerprint, path),
        };

        let script = state.script.clone().unwrap_or_default();
        let plan: Vec<ScriptSegment> = script
            .split("\n\n")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(index, text)| {
                let words = text.split_whitespace().count() as u64;
                ScriptSegment {
                    index,
                    text: text.to_string(),
                    estimated_secs: (words * 60 / WORDS_PER_MINUTE).max(1),
                }
            })
            .collect();

        let count = plan.len();
        let mut next = state;
        next.recording_plan = Some(plan);
        self.cache.put(STAGE_RECORDING, &fingerprint, next.clone());
        (next, format!("{}: {} segments planned", STAGE_RECORDING, count))
    }

    /// Stage 6: normalize the script text and summarize the cuts.
    pub async fn editing(
        &self,
        state: PipelineState,
        instruction: Option<&str>,
    ) -> (PipelineState, String) {
        let (fingerprint, _path) = match self.enter(STAGE_EDITING, &state, instruction) {
            Entry::Done(state, status) => return (state, status),
            Entry::Fresh { fingerprint, path } => (fingerprint, path),
        };

        let script = state.script.clone().unwrap_or_default();
        let (edited, removed) = normalize_script(&script);
        let words = edited.split_whitespace().count();
        let mut next = state;
        next.edit_summary = Some(format!(
            "{} words, {} blank lines removed",
            words, removed
        ));
        next.edited_script = Some(edited);
        self.cache.put(STAGE_EDITING, &fingerprint, next.clone());
        (next, format!("{}: ok", STAGE_EDITING))
    }

    /// Terminal stage: bundle a natural-language episode description from
    /// the backend and mark the state complete.
    pub async fn finalize(
        &self,
        state: PipelineState,
        instruction: Option<&str>,
    ) -> (PipelineState, String) {
        let (fingerprint, _path) = match self.enter(STAGE_FINALIZE, &state, instruction) {
            Entry::Done(state, status) => return (state, status),
            Entry::Fresh { fingerprint, path } => (fingerprint, path),
        };

        let prompt = description_prompt(&state, instruction);
        let description = self.generate_or_error(&prompt).await;
        let mut next = state;
        next.description = Some(description);
        next.status = Some("complete".to_string());
        self.cache.put(STAGE_FINALIZE, &fingerprint, next.clone());
        (next, format!("{}: ok", STAGE_FINALIZE))
    }

    /// Runs all seven stages in order, threading the state through.
    /// `instruction` is forwarded to every stage past analyze: the
    /// prose-producing ones feed it into their prompts, and the pure
    /// transforms treat it as a cache-bypass signal so a cached state
    /// from an earlier run cannot clobber the freshly generated fields.
    pub async fn run_all(
        &self,
        pdf_path: &str,
        instruction: Option<&str>,
    ) -> (PipelineState, Vec<(String, String)>) {
        let mut reports = Vec::new();

        let (state, status) = self.select(pdf_path).await;
        reports.push((STAGE_SELECT.to_string(), status));
        let (state, status) = self.analyze(state, None).await;
        reports.push((STAGE_ANALYZE.to_string(), status));
        let (state, status) = self.research(state, instruction).await;
        reports.push((STAGE_RESEARCH.to_string(), status));
        let (state, status) = self.script(state, instruction).await;
        reports.push((STAGE_SCRIPT.to_string(), status));
        let (state, status) = self.recording(state, instruction).await;
        reports.push((STAGE_RECORDING.to_string(), status));
        let (state, status) = self.editing(state, instruction).await;
        reports.push((STAGE_EDITING.to_string(), status));
        let (state, status) = self.finalize(state, instruction).await;
        reports.push((STAGE_FINALIZE.to_string(), status));

        (state, reports)
    }
}

fn title_and_author(state: &PipelineState) -> (String, String) {
    match &state.metadata {
        Some(meta) => (meta.title.clone(), meta.author.clone()),
        None => (
            state.pdf_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            "Unknown".to_string(),
        ),
    }
}

fn with_instruction(mut prompt: String, instruction: Option<&str>) -> String {
    if let Some(extra) = instruction {
        if !extra.trim().is_empty() {
            prompt.push_str("\n\nAdditional instruction: ");
            prompt.push_str(extra.trim());
        }
    }
    prompt
}

fn research_prompt(state: &PipelineState, instruction: Option<&str>) -> String {
    let (title, author) = title_and_author(state);
    with_instruction(
        format!(
            "You are preparing background research for a podcast episode about \
             the document \"{}\" by {}. Summarize its likely themes, audience, \
             and wider context in a few short paragraphs.",
            title, author
        ),
        instruction,
    )
}

fn script_prompt(state: &PipelineState, instruction: Option<&str>) -> String {
    let (title, author) = title_and_author(state);
    let notes = state.research_notes.as_deref().unwrap_or("");
    with_instruction(
        format!(
            "Write a two-host podcast script discussing \"{}\" by {}. \
             Use plain conversational language and separate segments with \
             blank lines.\n\nBackground research:\n{}",
            title, author, notes
        ),
        instruction,
    )
}

fn description_prompt(state: &PipelineState, instruction: Option<&str>) -> String {
    let (title, author) = title_and_author(state);
    with_instruction(
        format!(
            "Write a one-paragraph episode description for a podcast about \
             \"{}\" by {}, suitable for a listings page.",
            title, author
        ),
        instruction,
    )
}

/// Collapses runs of blank lines to a single blank line and strips
/// trailing whitespace per line. Returns the text and how many blank
/// lines were dropped.
fn normalize_script(script: &str) -> (String, usize) {
    let mut out: Vec<&str> = Vec::new();
    let mut removed = 0usize;
    let mut blank_run = 0usize;
    for line in script.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                removed += 1;
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    (out.join("\n").trim().to_string(), removed)
}
