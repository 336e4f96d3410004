//! # bibcast CLI (`bib`)
//!
//! The `bib` binary is the primary interface for bibcast. It provides
//! commands for listing the document pool, inspecting a single PDF's
//! resolved metadata, and running the staged podcast pipeline.
//!
//! ## Usage
//!
//! ```bash
//! bib --config ./config/bib.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bib scan` | Walk the pool root and list every PDF found |
//! | `bib inspect <pdf>` | Print resolved bibliographic metadata with provenance |
//! | `bib run <pdf>` | Run all pipeline stages and print the final state |
//!
//! ## Examples
//!
//! ```bash
//! # List the configured document pool
//! bib scan --config ./config/bib.toml
//!
//! # Resolved metadata for one document (works without a config file)
//! bib inspect ./papers/attention.pdf
//!
//! # Full pipeline with a fresh-script instruction
//! bib run ./papers/attention.pdf --instruction "keep it under five minutes"
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bibcast::aggregate::MetadataAggregator;
use bibcast::backend;
use bibcast::config::{self, Config};
use bibcast::models::ResolvedMetadata;
use bibcast::pipeline::Pipeline;
use bibcast::progress::ProgressMode;
use bibcast::scan::{spawn_background_scan, ScanStatus};

/// bibcast CLI: a local-first bibliographic metadata pipeline for PDF
/// document pools.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/bib.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "bib",
    about = "bibcast: a local-first bibliographic metadata pipeline for PDF document pools",
    version,
    long_about = "bibcast scans a directory tree for PDF documents, infers structured \
    bibliographic metadata (embedded metadata merged with text-pattern heuristics, with \
    per-field provenance), and runs a staged, cacheable podcast-preparation pipeline \
    backed by a local language model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/bib.toml`. Pool, extraction, cache, and
    /// backend settings are read from this file. `inspect` and `run`
    /// fall back to built-in defaults when the file is absent.
    #[arg(long, global = true, default_value = "./config/bib.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Walk the document pool and list every PDF found.
    ///
    /// Runs the scan on a background thread and reports progress on
    /// stderr; stdout carries the listing only.
    Scan {
        /// Progress mode: `human`, `json`, or `off`. Defaults to human
        /// when stderr is a TTY, otherwise off.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print resolved bibliographic metadata for a single PDF.
    ///
    /// Combines the document's embedded metadata with text-pattern
    /// extraction and shows which source supplied each field.
    Inspect {
        /// Path to the PDF file.
        pdf: PathBuf,

        /// Emit the full record as JSON instead of the human summary.
        #[arg(long)]
        json: bool,
    },

    /// Run the staged pipeline (select → analyze → research → script →
    /// recording → editing → finalize) against one PDF.
    ///
    /// Stage statuses are printed as they complete. Backend failures are
    /// embedded in the affected fields; only document-level failures
    /// abort downstream stages.
    Run {
        /// Path to the PDF file.
        pdf: PathBuf,

        /// Extra guidance for the prose-producing stages. A non-empty
        /// instruction bypasses their cached results.
        #[arg(long)]
        instruction: Option<String>,

        /// Emit the final pipeline state as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { progress } => {
            let cfg = config::load_config(&cli.config)?;
            run_scan(cfg, progress.as_deref())?;
        }
        Commands::Inspect { pdf, json } => {
            let cfg = load_or_minimal(&cli.config);
            run_inspect(&cfg, &pdf, json)?;
        }
        Commands::Run {
            pdf,
            instruction,
            json,
        } => {
            let cfg = load_or_minimal(&cli.config);
            run_pipeline(&cfg, &pdf, instruction.as_deref(), json).await?;
        }
    }

    Ok(())
}

/// `inspect` and `run` work on a single file and don't need a pool root,
/// so a missing config file falls back to defaults.
fn load_or_minimal(path: &PathBuf) -> Config {
    config::load_config(path).unwrap_or_else(|_| Config::minimal())
}

fn run_scan(cfg: Config, progress: Option<&str>) -> Result<()> {
    let mode = match progress {
        Some("off") => ProgressMode::Off,
        Some("human") => ProgressMode::Human,
        Some("json") => ProgressMode::Json,
        Some(other) => anyhow::bail!("Unknown progress mode: '{}'. Must be human, json, or off.", other),
        None => ProgressMode::default_for_tty(),
    };

    let root = cfg.pool.root.display().to_string();
    let status = ScanStatus::new();
    let handle = spawn_background_scan(cfg, status, mode.reporter());
    let records = handle
        .join()
        .map_err(|_| anyhow::anyhow!("scan thread panicked"))??;

    println!("scan {}", root);
    println!("  documents found: {}", records.len());
    for record in &records {
        println!("  {}  ({} bytes)", record.path, record.file_size);
    }
    println!("ok");
    Ok(())
}

fn run_inspect(cfg: &Config, pdf: &PathBuf, json: bool) -> Result<()> {
    let aggregator = MetadataAggregator::new(cfg.extraction.max_pages);
    let meta = aggregator.aggregate(pdf)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    print_metadata(&meta);
    Ok(())
}

fn print_metadata(meta: &ResolvedMetadata) {
    let provenance = |found: bool| if found { "metadata" } else { "text" };
    println!("title: {}", meta.title);
    println!(
        "author: {}  (source: {})",
        meta.author,
        provenance(meta.author_found_in_metadata)
    );
    println!(
        "publisher: {}  (source: {})",
        meta.publisher,
        provenance(meta.publisher_found_in_metadata)
    );
    println!(
        "pages: {}  (text extracted from {}/{})",
        meta.page_count, meta.pages_extracted, meta.pages_attempted
    );
    if let Some(year) = meta.copyright_year {
        println!("copyright year: {}", year);
    }
    if let Some(isbn) = &meta.isbn {
        println!("isbn: {}", isbn);
    }
    if let Some(doi) = &meta.doi {
        println!("doi: {}", doi);
    }
    if let Some(keywords) = &meta.keywords {
        println!("keywords: {}", keywords);
    }
    if let Some(abstract_text) = &meta.abstract_text {
        println!("abstract: {}", abstract_text);
    }
    if !meta.author_candidates.is_empty() {
        let names: Vec<&str> = meta
            .author_candidates
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        println!("author candidates: {}", names.join(", "));
    }
    if !meta.publisher_candidates.is_empty() {
        let names: Vec<&str> = meta
            .publisher_candidates
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        println!("publisher candidates: {}", names.join(", "));
    }
}

async fn run_pipeline(
    cfg: &Config,
    pdf: &PathBuf,
    instruction: Option<&str>,
    json: bool,
) -> Result<()> {
    let backend = backend::create_backend(&cfg.backend)?;
    let pipeline = Pipeline::from_config(cfg, backend);

    let path = pdf.to_string_lossy().to_string();
    let (state, reports) = pipeline.run_all(&path, instruction).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("run {}", path);
    // status strings already carry the stage name
    for (_stage, report) in &reports {
        println!("  {}", report);
    }
    if let Some(error) = &state.error {
        println!("error: {}", error);
        return Ok(());
    }
    if let Some(meta) = &state.metadata {
        println!("author: {}", meta.author);
        println!("publisher: {}", meta.publisher);
    }
    if let Some(description) = &state.description {
        println!("description: {}", description);
    }
    println!("ok");
    Ok(())
}
