//! Plain-text parser and the shared decoding fallback chain.
//!
//! Log files in the wild are not reliably UTF-8. Decoding tries UTF-8
//! first, then Windows-1251, then Windows-1252 (a superset of Latin-1 in
//! which every byte is defined), so the chain effectively always yields
//! text for readable files; only I/O failures produce an empty result.

use std::path::Path;

const FALLBACK_ENCODINGS: &[&encoding_rs::Encoding] =
    &[encoding_rs::WINDOWS_1251, encoding_rs::WINDOWS_1252];

/// Read a file as text using the decoding fallback chain. `None` means the
/// file could not be read or decoded; the cause has been logged.
pub fn read_text(path: &Path) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            return None;
        }
    };
    decode(&bytes, path)
}

fn decode(bytes: &[u8], path: &Path) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => return Some(s.to_string()),
        Err(_) => {
            tracing::debug!(path = %path.display(), "not valid UTF-8, trying fallback encodings");
        }
    }

    for encoding in FALLBACK_ENCODINGS {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            tracing::debug!(path = %path.display(), encoding = encoding.name(), "decoded with fallback encoding");
            return Some(decoded.into_owned());
        }
    }

    tracing::warn!(path = %path.display(), "unsupported encoding, skipping file");
    None
}

/// Strip each line and keep the non-empty ones verbatim.
pub fn parse(path: &Path) -> Vec<String> {
    let Some(content) = read_text(path) else {
        return Vec::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
