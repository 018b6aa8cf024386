//! JSON flattened to `key.path: value` lines

use super::framework::{Extraction, Extractor};
use serde_json::Value;

pub struct JsonExtractor;

impl Extractor for JsonExtractor {
    fn format_name(&self) -> &str {
        "json"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json", "jsonl", "ndjson", "geojson"]
    }

    fn extract(&self, content: &str) -> Extraction {
        let mut lines = Vec::new();
        let mut title = None;
        let mut author = None;

        let documents: Vec<Value> = match serde_json::from_str::<Value>(content) {
            Ok(value) => vec![value],
            // JSON lines
            Err(_) => content
                .lines()
                .filter_map(|l| serde_json::from_str::<Value>(l.trim()).ok())
                .collect(),
        };

        if documents.is_empty() {
            return Extraction::from_text(content);
        }

        for doc in &documents {
            if title.is_none() {
                title = top_level_string(doc, &["title", "name"]);
            }
            if author.is_none() {
                author = top_level_string(doc, &["author", "owner"]);
            }
            flatten(doc, String::new(), &mut lines);
        }

        Extraction {
            text: lines.join("\n"),
            title,
            author,
            subject: None,
        }
    }
}

/// Append one `path: value` line per scalar leaf
pub fn flatten(value: &Value, prefix: String, out: &mut Vec<String>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(child, join(key), out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                flatten(child, join(&idx.to_string()), out);
            }
        }
        Value::Null => {}
        Value::String(s) => push_leaf(out, &prefix, s),
        other => push_leaf(out, &prefix, &other.to_string()),
    }
}

fn push_leaf(out: &mut Vec<String>, path: &str, value: &str) {
    if path.is_empty() {
        out.push(value.to_string());
    } else {
        out.push(format!("{}: {}", path, value));
    }
}

fn top_level_string(doc: &Value, keys: &[&str]) -> Option<String> {
    let map = doc.as_object()?;
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested() {
        let json = r#"{"title": "Config", "server": {"host": "localhost", "ports": [80, 443]}, "debug": null}"#;
        let ext = JsonExtractor.extract(json);

        assert_eq!(ext.title.as_deref(), Some("Config"));
        let lines: Vec<&str> = ext.text.lines().collect();
        assert!(lines.contains(&"title: Config"));
        assert!(lines.contains(&"server.host: localhost"));
        assert!(lines.contains(&"server.ports.1: 443"));
        assert!(!ext.text.contains("debug"));
    }

    #[test]
    fn test_json_lines() {
        let ext = JsonExtractor.extract("{\"event\": \"a\"}\n{\"event\": \"b\"}\n");
        assert_eq!(ext.text, "event: a\nevent: b");
    }

    #[test]
    fn test_invalid_json_kept_as_text() {
        let ext = JsonExtractor.extract("not json at all");
        assert_eq!(ext.text, "not json at all");
    }
}
