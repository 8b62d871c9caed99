//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! File-level and parse-level failures are recovered inside the component
//! that hit them and logged; only directory-level discovery failures and
//! store mutation failures cross component boundaries, as typed errors.
//! The CLI boundary wraps these in `anyhow` for presentation.

use std::path::PathBuf;

/// Discovery-time failure. Only a missing root is fatal; an empty walk is
/// reported as an empty result, not an error.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Terminal failure of an ingestion run. Per-file errors never surface here;
/// they degrade to empty contributions and keep the batch running.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("no supported files found under {0}")]
    NoSupportedFiles(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DiscoveryError> for IngestError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::DirectoryNotFound(path) => IngestError::DirectoryNotFound(path),
        }
    }
}

/// Archive expansion failure, logged by the expander and converted into an
/// empty contribution for that archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip extraction failed: {0}")]
    Zip(String),

    #[error("tar extraction failed: {0}")]
    Tar(String),

    #[error("rar extraction failed: {0}")]
    Rar(String),
}

/// Platform event log access failure. Both variants degrade to an empty
/// result for the affected file.
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("no event log source is available on this platform")]
    Unavailable,

    #[error("event log access failed: {0}")]
    Access(String),
}

/// Embedding capability failure.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("embedding configuration error: {0}")]
    Config(String),

    #[error("embedding request failed: {0}")]
    Http(String),

    #[error("invalid embedding response: {0}")]
    BadResponse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Vector store failure. Mutations report these instead of panicking; the
/// in-memory state may be ahead of disk after a persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("vector index file is malformed: {0}")]
    IndexFormat(String),

    #[error("store is inconsistent: {vectors} vectors but {texts} texts")]
    Corrupt { vectors: usize, texts: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}
