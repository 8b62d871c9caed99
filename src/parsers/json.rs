//! JSON and JSON-lines parser.
//!
//! Each line is parsed as one JSON value. Valid values are re-emitted
//! pretty-printed with two-space indentation; malformed but non-empty
//! lines are kept as raw trimmed text rather than dropped.

use std::path::Path;

pub fn parse(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read JSON file");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(pretty) => records.push(pretty),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to render JSON value");
                    records.push(trimmed.to_string());
                }
            },
            Err(_) => records.push(trimmed.to_string()),
        }
    }
    records
}
