//! Platform event log access.
//!
//! Event logs are read through the [`EventLogSource`] capability trait so
//! the platform binding stays outside the pipeline: an embedding
//! application supplies a real implementation, and the shipped default
//! reports itself unavailable. Either way an `.evtx` file degrades to an
//! empty contribution instead of failing the run.

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::EventLogError;

/// Hard cap on events read from a single log, newest first.
pub const MAX_EVENTS: usize = 1000;

/// A single decoded platform event.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_id: u32,
    pub time_generated: DateTime<Utc>,
    pub source_name: String,
    pub event_type: u16,
    pub event_category: u16,
    /// Message parameter strings; may be empty.
    pub string_inserts: Vec<String>,
}

/// Capability for reading platform event logs.
///
/// Implementations read backwards from the most recent event, sequentially,
/// stopping at `max` events or log exhaustion. A single undecodable event
/// is the implementation's problem to skip; only total access failure is
/// reported as an error.
pub trait EventLogSource: Send + Sync {
    fn read_backwards(&self, path: &Path, max: usize)
        -> Result<Vec<EventRecord>, EventLogError>;
}

/// Default source for platforms without an event log binding.
pub struct UnavailableEventLog;

impl EventLogSource for UnavailableEventLog {
    fn read_backwards(
        &self,
        _path: &Path,
        _max: usize,
    ) -> Result<Vec<EventRecord>, EventLogError> {
        Err(EventLogError::Unavailable)
    }
}

/// Parse an event log file through the supplied source. Never fails: access
/// errors are logged and yield an empty result.
pub fn parse(path: &Path, source: &dyn EventLogSource) -> Vec<String> {
    match source.read_backwards(path, MAX_EVENTS) {
        Ok(events) => events.iter().take(MAX_EVENTS).map(format_event).collect(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "event log unreadable, skipping");
            Vec::new()
        }
    }
}

fn format_event(event: &EventRecord) -> String {
    let message = {
        let inserts: Vec<&str> = event
            .string_inserts
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if inserts.is_empty() {
            event.source_name.clone()
        } else {
            inserts.join(" | ")
        }
    };

    format!(
        "EventID: {} | Time: {} | Source: {} | Type: {} | Category: {} | Message: {}",
        event.event_id,
        event.time_generated.format("%Y-%m-%d %H:%M:%S"),
        event.source_name,
        event.event_type,
        event.event_category,
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct StaticEventLog(Vec<EventRecord>);

    impl EventLogSource for StaticEventLog {
        fn read_backwards(
            &self,
            _path: &Path,
            max: usize,
        ) -> Result<Vec<EventRecord>, EventLogError> {
            Ok(self.0.iter().take(max).cloned().collect())
        }
    }

    fn record(id: u32, inserts: &[&str]) -> EventRecord {
        EventRecord {
            event_id: id,
            time_generated: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            source_name: "Service Control Manager".to_string(),
            event_type: 1,
            event_category: 0,
            string_inserts: inserts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn formats_event_with_inserts() {
        let source = StaticEventLog(vec![record(7036, &["svc", "running"])]);
        let lines = parse(Path::new("System.evtx"), &source);
        assert_eq!(
            lines,
            vec![
                "EventID: 7036 | Time: 2024-03-01 12:00:00 | Source: Service Control Manager | Type: 1 | Category: 0 | Message: svc | running"
            ]
        );
    }

    #[test]
    fn falls_back_to_source_name_without_inserts() {
        let source = StaticEventLog(vec![record(1, &[])]);
        let lines = parse(Path::new("System.evtx"), &source);
        assert!(lines[0].ends_with("Message: Service Control Manager"));
    }

    #[test]
    fn caps_at_max_events() {
        let source = StaticEventLog((0..2 * MAX_EVENTS as u32).map(|i| record(i, &[])).collect());
        let lines = parse(Path::new("System.evtx"), &source);
        assert_eq!(lines.len(), MAX_EVENTS);
    }

    #[test]
    fn unavailable_source_degrades_to_empty() {
        let lines = parse(Path::new("System.evtx"), &UnavailableEventLog);
        assert!(lines.is_empty());
    }
}
