//! YAML parser.
//!
//! The whole document is parsed and, when non-empty, re-serialized
//! canonically (block style, keys in document order) as a single
//! multi-line record.

use std::path::Path;

pub fn parse(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read YAML file");
            return Vec::new();
        }
    };

    let value: serde_yaml::Value = match serde_yaml::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse YAML file");
            return Vec::new();
        }
    };

    if value.is_null() {
        return Vec::new();
    }

    match serde_yaml::to_string(&value) {
        Ok(rendered) => vec![rendered.trim_end().to_string()],
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to render YAML document");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reserializes_document_as_one_record() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf.yaml");
        fs::write(&path, "service: api\nreplicas: 3\n").unwrap();

        let records = parse(&path);
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("service: api"));
        assert!(records[0].contains("replicas: 3"));
    }

    #[test]
    fn empty_document_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf.yaml");
        fs::write(&path, "\n").unwrap();

        assert!(parse(&path).is_empty());
    }

    #[test]
    fn malformed_document_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf.yaml");
        fs::write(&path, "key: [unclosed\n").unwrap();

        assert!(parse(&path).is_empty());
    }

    #[test]
    fn unicode_survives_reserialization() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf.yml");
        fs::write(&path, "message: привет\n").unwrap();

        let records = parse(&path);
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("привет"));
    }
}
