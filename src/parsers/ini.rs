//! INI/conf parser.
//!
//! Emits a `"[section]"` line per section followed by one `"key = value"`
//! line per entry, preserving file order.

use ini::Ini;
use std::path::Path;

pub fn parse(path: &Path) -> Vec<String> {
    let conf = match Ini::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse INI file");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for (section, properties) in conf.iter() {
        // Keys outside any section have no header to report under.
        let Some(name) = section else {
            continue;
        };
        records.push(format!("[{}]", name));
        for (key, value) in properties.iter() {
            records.push(format!("{} = {}", key, value));
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn emits_section_then_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("app.ini");
        fs::write(&path, "[s]\nk=v\n").unwrap();

        assert_eq!(parse(&path), vec!["[s]", "k = v"]);
    }

    #[test]
    fn preserves_file_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("app.conf");
        fs::write(&path, "[first]\nb=2\na=1\n[second]\nc=3\n").unwrap();

        assert_eq!(
            parse(&path),
            vec!["[first]", "b = 2", "a = 1", "[second]", "c = 3"]
        );
    }

    #[test]
    fn malformed_file_yields_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("app.ini");
        fs::write(&path, "[unclosed\n").unwrap();

        assert!(parse(&path).is_empty());
    }
}
