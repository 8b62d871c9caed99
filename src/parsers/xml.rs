//! XML parser.
//!
//! Depth-first traversal emitting one line per element:
//! `"<indent><tag>: <text>"` where the indent is two spaces per nesting
//! level and the text is the element's own leading text, trimmed. Parents
//! are emitted before their children. A syntax error mid-document keeps
//! whatever was emitted so far.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

pub fn parse(path: &Path) -> Vec<String> {
    let mut reader = match Reader::from_file(path) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to open XML file");
            return Vec::new();
        }
    };
    reader.config_mut().trim_text(true);

    let mut lines = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    // Element whose line has not been emitted yet: its leading text (if
    // any) is the next text event before a child or its end tag.
    let mut pending: Option<(String, usize)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if let Some((tag, d)) = pending.take() {
                    lines.push(node_line(&tag, d, ""));
                }
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                pending = Some((tag, depth));
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if let Some((tag, d)) = pending.take() {
                    lines.push(node_line(&tag, d, ""));
                }
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                lines.push(node_line(&tag, depth, ""));
            }
            Ok(Event::Text(t)) => {
                if let Some((tag, d)) = pending.take() {
                    let text = t.unescape().unwrap_or_default();
                    lines.push(node_line(&tag, d, text.trim()));
                }
                // Tail text between siblings is not part of any element's
                // leading text and is dropped.
            }
            Ok(Event::End(_)) => {
                if let Some((tag, d)) = pending.take() {
                    lines.push(node_line(&tag, d, ""));
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "XML parse error, keeping partial output");
                break;
            }
        }
        buf.clear();
    }

    lines
}

fn node_line(tag: &str, depth: usize, text: &str) -> String {
    format!("{}{}: {}", "  ".repeat(depth), tag, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn indents_children_under_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.xml");
        fs::write(
            &path,
            "<events><event>boot</event><event>shutdown</event></events>",
        )
        .unwrap();

        let lines = parse(&path);
        assert_eq!(
            lines,
            vec!["events: ", "  event: boot", "  event: shutdown"]
        );
    }

    #[test]
    fn element_text_is_trimmed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.xml");
        fs::write(&path, "<root>  hello  </root>").unwrap();

        assert_eq!(parse(&path), vec!["root: hello"]);
    }

    #[test]
    fn malformed_document_keeps_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.xml");
        fs::write(&path, "<root><a>one</a><b>two</zzz>").unwrap();

        let lines = parse(&path);
        assert!(lines.contains(&"  a: one".to_string()));
    }

    #[test]
    fn self_closing_elements_emit_empty_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.xml");
        fs::write(&path, "<root><marker/></root>").unwrap();

        assert_eq!(parse(&path), vec!["root: ", "  marker: "]);
    }
}
