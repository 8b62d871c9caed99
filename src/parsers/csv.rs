//! CSV parser.
//!
//! The first line is the header. Every following non-empty row is zipped
//! with the header into `"header: value"` pairs joined by `" | "`. The
//! split is a plain comma split — the normalization rule is positional,
//! not quote-aware — and ragged rows zip to the shorter side.

use std::path::Path;

pub fn parse(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read CSV file");
            return Vec::new();
        }
    };

    let mut lines = content.lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header: Vec<&str> = header_line.trim().split(',').collect();

    let mut records = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let values = trimmed.split(',');
        let record = header
            .iter()
            .zip(values)
            .map(|(h, v)| format!("{}: {}", h, v))
            .collect::<Vec<_>>()
            .join(" | ");
        records.push(record);
    }
    records
}
