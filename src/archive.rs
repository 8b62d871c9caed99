//! Archive expansion into a scratch directory.
//!
//! Supports zip, tar (plain or gzip-wrapped), and rar containers,
//! dispatched by extension over the closed [`ArchiveKind`] enum. Expansion
//! reports success as a bool: an unrecognized extension or a failed
//! extraction contributes nothing to the run and is logged, never raised.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ArchiveError;

/// Closed set of supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    /// `.gz` files are treated as gzip-wrapped tar.
    TarGz,
    Rar,
}

impl ArchiveKind {
    pub fn from_extension(ext: &str) -> Option<ArchiveKind> {
        match ext.to_lowercase().as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "tar" => Some(ArchiveKind::Tar),
            "gz" => Some(ArchiveKind::TarGz),
            "rar" => Some(ArchiveKind::Rar),
            _ => None,
        }
    }
}

/// Expand `archive` into `scratch`. Returns `true` when all entries were
/// extracted, `false` (with the cause logged) otherwise.
pub fn expand(archive: &Path, scratch: &Path) -> bool {
    let ext = archive
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let Some(kind) = ArchiveKind::from_extension(ext) else {
        tracing::warn!(path = %archive.display(), extension = ext, "unsupported archive format");
        return false;
    };

    let result = match kind {
        ArchiveKind::Zip => expand_zip(archive, scratch),
        ArchiveKind::Tar => expand_tar(archive, scratch, false),
        ArchiveKind::TarGz => expand_tar(archive, scratch, true),
        ArchiveKind::Rar => expand_rar(archive, scratch),
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %archive.display(), error = %e, "archive expansion failed");
            false
        }
    }
}

fn expand_zip(archive: &Path, scratch: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Zip(e.to_string()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| ArchiveError::Zip(e.to_string()))?;

        // Entries with traversal tricks in their names are skipped.
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(archive = %archive.display(), entry = entry.name(), "skipping unsafe zip entry name");
            continue;
        };
        let dest = scratch.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)?;
            std::io::copy(&mut entry, &mut out)?;
        }
    }

    Ok(())
}

fn expand_tar(archive: &Path, scratch: &Path, gzipped: bool) -> Result<(), ArchiveError> {
    let file = File::open(archive)?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(flate2::read::GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    // `unpack` refuses entries that would escape the destination.
    tar::Archive::new(reader)
        .unpack(scratch)
        .map_err(|e| ArchiveError::Tar(e.to_string()))
}

fn expand_rar(archive: &Path, scratch: &Path) -> Result<(), ArchiveError> {
    let mut rar = unrar::Archive::new(archive)
        .open_for_processing()
        .map_err(|e| ArchiveError::Rar(e.to_string()))?;

    while let Some(header) = rar
        .read_header()
        .map_err(|e| ArchiveError::Rar(e.to_string()))?
    {
        rar = if header.entry().is_file() {
            header
                .extract_with_base(scratch)
                .map_err(|e| ArchiveError::Rar(e.to_string()))?
        } else {
            header
                .skip()
                .map_err(|e| ArchiveError::Rar(e.to_string()))?
        };
    }

    Ok(())
}
