//! Log dialect classification and parser dispatch.
//!
//! Every direct extension maps onto one variant of [`LogFormat`]; the
//! match in [`parse_file`] is exhaustive, so adding a dialect means adding
//! a variant and a handler, checked by the compiler.

use std::path::Path;

use crate::eventlog::{self, EventLogSource};
use crate::parsers;

/// Closed set of supported log dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text and any direct extension without a dedicated parser.
    Plain,
    Json,
    Csv,
    Xml,
    Yaml,
    Ini,
    Syslog,
    EventLog,
}

impl LogFormat {
    /// Map a lowercased extension to its dialect. Unrecognized direct
    /// extensions (`log`, `out`, `err`, ...) fall back to plain text.
    pub fn from_extension(ext: &str) -> LogFormat {
        match ext.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            "csv" => LogFormat::Csv,
            "xml" => LogFormat::Xml,
            "yaml" | "yml" => LogFormat::Yaml,
            "ini" | "conf" => LogFormat::Ini,
            "syslog" => LogFormat::Syslog,
            "evtx" => LogFormat::EventLog,
            _ => LogFormat::Plain,
        }
    }
}

/// Parse one file into normalized records. Infallible by contract: every
/// parser recovers its own failures and degrades to partial or empty
/// output.
pub fn parse_file(path: &Path, format: LogFormat, events: &dyn EventLogSource) -> Vec<String> {
    tracing::debug!(path = %path.display(), ?format, "parsing file");
    match format {
        LogFormat::Plain => parsers::text::parse(path),
        LogFormat::Json => parsers::json::parse(path),
        LogFormat::Csv => parsers::csv::parse(path),
        LogFormat::Xml => parsers::xml::parse(path),
        LogFormat::Yaml => parsers::yaml::parse(path),
        LogFormat::Ini => parsers::ini::parse(path),
        LogFormat::Syslog => parsers::syslog::parse(path),
        LogFormat::EventLog => eventlog::parse(path, events),
    }
}
