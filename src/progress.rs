//! Ingestion progress reporting.
//!
//! The coordinator emits [`ProgressEvent`] messages on a fire-and-forget
//! channel; an observer drains them into a [`ProgressReporter`]. Progress
//! is rendered on **stderr** so stdout remains parseable for scripts.
//! Events are ordered per worker only; interleaving across workers carries
//! no guarantee.

use std::io::Write;
use std::path::PathBuf;

/// A single progress event for an ingestion run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Walking the root directory; totals unknown yet.
    DiscoveryStarted { root: PathBuf },
    /// Discovery finished; the file count is known.
    FilesDiscovered { count: usize },
    /// A parse task started on this file.
    FileStarted { path: PathBuf },
    /// A parse task finished, contributing `lines` records.
    FileFinished { path: PathBuf, lines: usize },
    /// A task was dropped because the line budget was already spent.
    FileSkipped { path: PathBuf },
    /// The run completed and the corpus is aggregated.
    Completed { total_lines: usize },
    /// The run hit a terminal, directory-level failure.
    Failed { message: String },
}

/// Renders progress events. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  parsed app.log  120 lines".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: &ProgressEvent) {
        let line = match event {
            ProgressEvent::DiscoveryStarted { root } => {
                format!("ingest  discovering {}...\n", root.display())
            }
            ProgressEvent::FilesDiscovered { count } => {
                format!("ingest  found {} files\n", format_number(*count as u64))
            }
            ProgressEvent::FileStarted { path } => {
                format!("ingest  parsing {}\n", display_name(path))
            }
            ProgressEvent::FileFinished { path, lines } => {
                format!(
                    "ingest  parsed {}  {} lines\n",
                    display_name(path),
                    format_number(*lines as u64)
                )
            }
            ProgressEvent::FileSkipped { path } => {
                format!("ingest  skipped {} (line budget spent)\n", display_name(path))
            }
            ProgressEvent::Completed { total_lines } => {
                format!(
                    "ingest  done  {} lines total\n",
                    format_number(*total_lines as u64)
                )
            }
            ProgressEvent::Failed { message } => format!("ingest  failed: {}\n", message),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: &ProgressEvent) {
        let obj = match event {
            ProgressEvent::DiscoveryStarted { root } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "root": root.display().to_string()
            }),
            ProgressEvent::FilesDiscovered { count } => serde_json::json!({
                "event": "progress",
                "phase": "discovered",
                "count": count
            }),
            ProgressEvent::FileStarted { path } => serde_json::json!({
                "event": "progress",
                "phase": "file_started",
                "path": path.display().to_string()
            }),
            ProgressEvent::FileFinished { path, lines } => serde_json::json!({
                "event": "progress",
                "phase": "file_finished",
                "path": path.display().to_string(),
                "lines": lines
            }),
            ProgressEvent::FileSkipped { path } => serde_json::json!({
                "event": "progress",
                "phase": "file_skipped",
                "path": path.display().to_string()
            }),
            ProgressEvent::Completed { total_lines } => serde_json::json!({
                "event": "progress",
                "phase": "completed",
                "total_lines": total_lines
            }),
            ProgressEvent::Failed { message } => serde_json::json!({
                "event": "progress",
                "phase": "failed",
                "message": message
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn display_name_prefers_file_name() {
        assert_eq!(display_name(std::path::Path::new("/a/b/app.log")), "app.log");
    }
}
