//! # bibcast
//!
//! A local-first bibliographic metadata pipeline for PDF document pools.
//!
//! bibcast scans a directory tree for PDFs, infers structured
//! bibliographic metadata per document (embedded PDF metadata merged with
//! regex text heuristics, with per-field provenance), and runs a staged,
//! cacheable pipeline that prepares podcast material from a document,
//! calling a local language-model backend for the prose-producing stages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────────────┐   ┌───────────────┐
//! │  Pool    │──▶│  Aggregator          │──▶│  Pipeline      │
//! │ scan/fs  │   │ extract + patterns  │   │ 7 stages + TTL │
//! └──────────┘   └─────────────────────┘   └──────┬────────┘
//!                                                 │
//!                                           ┌─────▼─────┐
//!                                           │  Backend   │
//!                                           │  (Ollama)  │
//!                                           └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bib scan                      # list the document pool
//! bib inspect ./paper.pdf       # resolved metadata with provenance
//! bib run ./paper.pdf           # full staged pipeline
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`scan`] | Document pool discovery |
//! | [`extract`] | PDF text and embedded-metadata extraction |
//! | [`patterns`] | Regex author/publisher candidate extraction |
//! | [`aggregate`] | Metadata aggregation with provenance |
//! | [`cache`] | TTL result cache and fingerprints |
//! | [`backend`] | Language-model backend abstraction |
//! | [`pipeline`] | Staged pipeline runner |
//! | [`progress`] | Scan progress reporting |

pub mod aggregate;
pub mod backend;
pub mod cache;
pub mod config;
pub mod extract;
pub mod models;
pub mod patterns;
pub mod pipeline;
pub mod progress;
pub mod scan;

#[cfg(test)]
pub(crate) mod testpdf;
