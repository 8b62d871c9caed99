//! Format-specific normalization parsers.
//!
//! Every parser follows the same contract: `parse(path) -> Vec<String>`,
//! one normalized text record per element, empty records dropped. Parsers
//! never propagate errors — any per-line or per-file failure is logged and
//! degrades to partial or empty output, so one malformed file can never
//! abort an ingestion run.

pub mod csv;
pub mod ini;
pub mod json;
pub mod syslog;
pub mod text;
pub mod xml;
pub mod yaml;
