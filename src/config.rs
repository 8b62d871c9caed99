use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::store::EMBEDDING_DIM;

/// Top-level configuration, passed by reference into every component.
/// There is no ambient global state; everything a component needs to know
/// about its environment comes from here.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Ingestion settings: format allow-sets, exclusion globs, the run-wide
/// line budget, and the worker pool bound.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Extensions (lowercase, no dot) parsed directly by a format parser.
    #[serde(default = "default_direct_extensions")]
    pub direct_extensions: Vec<String>,

    /// Extensions treated as archive containers to expand.
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// Paths matching any of these globs are skipped during discovery.
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,

    /// Maximum normalized lines aggregated in one run. Soft cap: an
    /// in-flight parse is not interrupted, but its excess output is
    /// dropped at aggregation.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Upper bound on parse workers. The effective pool size is further
    /// clamped against the machine's hardware concurrency.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            direct_extensions: default_direct_extensions(),
            archive_extensions: default_archive_extensions(),
            exclude_globs: default_exclude_globs(),
            max_lines: default_max_lines(),
            max_workers: default_max_workers(),
        }
    }
}

impl IngestConfig {
    /// Effective worker pool size: configured bound clamped low against
    /// hardware concurrency. Parse work is I/O bound, so oversubscribing
    /// buys nothing.
    pub fn worker_count(&self) -> usize {
        let hw = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_workers.max(1).min(hw.saturating_sub(1).max(1))
    }

    /// Case-insensitive membership test against the direct allow-set.
    pub fn is_direct_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.direct_extensions.iter().any(|e| e == &ext)
    }

    /// Case-insensitive membership test against the archive allow-set.
    pub fn is_archive_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.archive_extensions.iter().any(|e| e == &ext)
    }
}

fn default_direct_extensions() -> Vec<String> {
    [
        "log", "txt", "out", "err", "debug", "trace", "audit", "evtx", "json", "jsonl", "csv",
        "xml", "yaml", "yml", "ini", "conf", "syslog",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_archive_extensions() -> Vec<String> {
    ["zip", "gz", "tar", "rar"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ]
}

fn default_max_lines() -> usize {
    50_000
}

fn default_max_workers() -> usize {
    2
}

/// Vector store settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding the persisted index and metadata files.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Default number of neighbors returned by recall/search.
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            default_k: default_k(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./vector_db")
}

fn default_k() -> usize {
    5
}

/// Embedding capability settings. The model itself is external; this only
/// describes how to reach it.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"disabled"` or `"openai"` (any OpenAI-compatible endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub model: Option<String>,

    /// Must match the store dimension (384).
    #[serde(default)]
    pub dims: Option<usize>,

    /// Embeddings endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            endpoint: default_endpoint(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults,
/// so the tool works out of the box without a config file.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.ingest.max_lines == 0 {
        anyhow::bail!("ingest.max_lines must be > 0");
    }

    if config.ingest.max_workers == 0 {
        anyhow::bail!("ingest.max_workers must be > 0");
    }

    if config.ingest.direct_extensions.is_empty() && config.ingest.archive_extensions.is_empty() {
        anyhow::bail!(
            "at least one of ingest.direct_extensions / ingest.archive_extensions must be non-empty"
        );
    }

    if config.store.default_k == 0 {
        anyhow::bail!("store.default_k must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        match config.embedding.dims {
            Some(EMBEDDING_DIM) => {}
            Some(other) => anyhow::bail!(
                "embedding.dims must be {} to match the store, got {}",
                EMBEDDING_DIM,
                other
            ),
            None => anyhow::bail!(
                "embedding.dims must be specified when provider is '{}'",
                config.embedding.provider
            ),
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
