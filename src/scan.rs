//! Document pool discovery.
//!
//! Walks the configured root recursively for PDF files (case-insensitive
//! glob match), applying include/exclude patterns, and returns a
//! deterministic, path-sorted listing. A background variant runs the same
//! walk on a worker thread and publishes display-only counters that other
//! threads may read with relaxed freshness; nothing makes correctness
//! decisions from them.

use anyhow::{bail, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::DocumentRecord;
use crate::progress::{ScanProgressEvent, ScanProgressReporter};

pub fn scan_pool(config: &Config) -> Result<Vec<DocumentRecord>> {
    scan_pool_with(config, |_| {})
}

fn scan_pool_with(
    config: &Config,
    mut on_found: impl FnMut(&DocumentRecord),
) -> Result<Vec<DocumentRecord>> {
    let root = &config.pool.root;
    if !root.exists() {
        bail!("Document pool root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.pool.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/target/**".to_string()];
    default_excludes.extend(config.pool.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut records = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.pool.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        let record = file_to_record(path)?;
        on_found(&record);
        records.push(record);
    }

    // Sort for deterministic ordering
    records.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(records)
}

fn file_to_record(path: &Path) -> Result<DocumentRecord> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified_secs = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    Ok(DocumentRecord {
        path: path.to_string_lossy().to_string(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        file_size: metadata.len(),
        modified: modified_secs,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()?,
        );
    }
    Ok(builder.build()?)
}

/// Shared, display-only counters for a background scan. Values may be
/// read while the scan is still running; `ready` flips once the walk
/// completed.
#[derive(Default)]
pub struct ScanStatus {
    documents_found: AtomicU64,
    ready: AtomicBool,
}

impl ScanStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn documents_found(&self) -> u64 {
        self.documents_found.load(Ordering::Relaxed)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Runs `scan_pool` on a worker thread, updating `status` as documents
/// are discovered and reporting progress on the way.
pub fn spawn_background_scan(
    config: Config,
    status: Arc<ScanStatus>,
    reporter: Box<dyn ScanProgressReporter>,
) -> std::thread::JoinHandle<Result<Vec<DocumentRecord>>> {
    std::thread::spawn(move || {
        let root = config.pool.root.display().to_string();
        reporter.report(ScanProgressEvent::Discovering { root: root.clone() });

        let result = scan_pool_with(&config, |_| {
            let n = status.documents_found.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.report(ScanProgressEvent::Found {
                root: root.clone(),
                n,
            });
        });

        status.ready.store(true, Ordering::Release);
        if let Ok(records) = &result {
            reporter.report(ScanProgressEvent::Ready {
                root,
                total: records.len() as u64,
            });
        }
        result
    })
}
