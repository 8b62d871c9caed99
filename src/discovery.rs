//! File discovery: recursive walk and extension-based classification.
//!
//! Walks a root directory and classifies every regular file against the
//! configured allow-sets. Files matching neither set are skipped silently.
//! A missing root is the only fatal condition; an empty walk is a
//! distinguished empty result the coordinator reports as `NoSupportedFiles`.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::DiscoveryError;

/// A file selected for ingestion. Immutable once discovered.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// Absolute (or root-relative, as given) path to the file.
    pub path: PathBuf,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub origin: FileOrigin,
}

/// Where a candidate came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOrigin {
    /// Found directly under the ingestion root.
    Direct,
    /// Found inside an expanded archive.
    Extracted { archive: PathBuf },
}

/// Classification of a candidate against the allow-sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Direct,
    Archive,
}

impl CandidateFile {
    /// Which allow-set this candidate matched.
    pub fn class(&self, config: &IngestConfig) -> FileClass {
        if config.is_archive_extension(&self.extension) {
            FileClass::Archive
        } else {
            FileClass::Direct
        }
    }
}

/// Recursively walk `root` and collect every file whose extension is in
/// the direct or archive allow-set. Returns `Ok(vec![])` when the walk
/// completes without a single match.
pub fn discover(root: &Path, config: &IngestConfig) -> Result<Vec<CandidateFile>, DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::DirectoryNotFound(root.to_path_buf()));
    }

    let exclude_set = build_globset(&config.exclude_globs);

    let mut candidates = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                // Unreadable entries in untrusted trees are skipped, not fatal.
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if let Some(ref set) = exclude_set {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if set.is_match(relative) {
                continue;
            }
        }

        let Some(ext) = lowercase_extension(path) else {
            continue;
        };

        if config.is_direct_extension(&ext) || config.is_archive_extension(&ext) {
            candidates.push(CandidateFile {
                path: path.to_path_buf(),
                extension: ext,
                origin: FileOrigin::Direct,
            });
        }
    }

    tracing::debug!(count = candidates.len(), root = %root.display(), "discovery complete");
    Ok(candidates)
}

/// Walk an archive's extraction directory and collect files matching the
/// *direct* allow-set only. Archives found inside an archive are opaque:
/// they match nothing here and are never re-expanded. Failures degrade to
/// an empty result.
pub fn discover_extracted(
    scratch: &Path,
    archive: &Path,
    config: &IngestConfig,
) -> Vec<CandidateFile> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(scratch) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(archive = %archive.display(), error = %e, "skipping unreadable extracted entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(ext) = lowercase_extension(entry.path()) else {
            continue;
        };

        if config.is_direct_extension(&ext) {
            candidates.push(CandidateFile {
                path: entry.path().to_path_buf(),
                extension: ext,
                origin: FileOrigin::Extracted {
                    archive: archive.to_path_buf(),
                },
            });
        }
    }

    candidates
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "ignoring invalid exclude glob");
            }
        }
    }
    builder.build().ok()
}
