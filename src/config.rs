use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pool: PoolConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Document pool: where PDFs live and which ones count.
#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

// Globs are matched case-insensitively, so this covers `.PDF` too.
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Pages of body text to scan for metadata patterns. Title pages,
    /// copyright pages, and abstracts live in the first few pages.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
        }
    }
}

fn default_max_pages() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    /// `"path"` hashes the absolute file path (cheap; content changes
    /// under a stable path are invisible). `"content"` streams the file
    /// bytes through the digest instead.
    #[serde(default = "default_fingerprint")]
    pub fingerprint: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            fingerprint: default_fingerprint(),
        }
    }
}

fn default_ttl_secs() -> i64 {
    3600
}
fn default_fingerprint() -> String {
    "path".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}

impl BackendConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// Minimal config for one-shot commands that do not need a pool root
    /// (e.g. `bib inspect <file>` without a config file on disk).
    pub fn minimal() -> Self {
        Self {
            pool: PoolConfig {
                root: PathBuf::from("."),
                include_globs: default_include_globs(),
                exclude_globs: Vec::new(),
                follow_symlinks: false,
            },
            extraction: ExtractionConfig::default(),
            cache: CacheConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.extraction.max_pages == 0 {
        anyhow::bail!("extraction.max_pages must be > 0");
    }

    if config.cache.ttl_secs < 1 {
        anyhow::bail!("cache.ttl_secs must be >= 1");
    }

    match config.cache.fingerprint.as_str() {
        "path" | "content" => {}
        other => anyhow::bail!(
            "Unknown cache.fingerprint: '{}'. Must be path or content.",
            other
        ),
    }

    if config.backend.is_enabled() && config.backend.model.is_none() {
        anyhow::bail!(
            "backend.model must be specified when provider is '{}'",
            config.backend.provider
        );
    }

    match config.backend.provider.as_str() {
        "disabled" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown backend provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }

    Ok(config)
}
