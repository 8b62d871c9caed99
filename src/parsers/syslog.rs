//! Syslog parser.
//!
//! Attempts a structured match of `<priority>timestamp host program: message`
//! per line. Matches are reformatted into labeled fields; everything else
//! is kept as the raw trimmed line.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<(\d+)>(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}.\d+Z) (\S+) (\S+): (.*)")
            .expect("syslog pattern is valid")
    })
}

pub fn parse(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read syslog file");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = match entry_pattern().captures(trimmed) {
            Some(caps) => format!(
                "Priority: {} | Time: {} | Host: {} | Program: {} | Message: {}",
                &caps[1], &caps[2], &caps[3], &caps[4], &caps[5]
            ),
            None => trimmed.to_string(),
        };
        records.push(record);
    }
    records
}
