//! JSON and XML document analysis
//!
//! A document is reduced to a table: the walk descends through single-key
//! wrappers and common record keys (`data`, `records`, `rows`, `items`) to
//! the first list, whose objects are flattened with dotted keys. Without a
//! list the document itself becomes one row.

use super::table::{self, Table};
use super::{describe_numeric, render_stats, write_report, ColumnStats, StatsFormat};
use crate::{Error, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tabled::Tabled;

const RECORD_KEYS: &[&str] = &["data", "records", "rows", "items"];
const SAMPLE_VALUES: usize = 3;
/// Share of filled cells that must be numeric
const NUMERIC_SHARE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Json,
    Xml,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: String,
    pub unique: usize,
    pub nulls: usize,
    pub sample: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub path: PathBuf,
    pub format: DocumentFormat,
    /// Dotted path of the records inside the document; empty for the root
    pub records_at: String,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    pub non_numeric: Vec<String>,
    pub numeric: Vec<ColumnStats>,
}

/// Read a document, inflating `.gz` files
pub fn read_document(path: &Path, format: DocumentFormat) -> Result<Value> {
    let raw = std::fs::read(path)?;
    let gzipped = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));
    let bytes = if gzipped {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    match format {
        DocumentFormat::Json => Ok(serde_json::from_slice(&bytes)?),
        DocumentFormat::Xml => super::xml::to_value(&String::from_utf8_lossy(&bytes)),
    }
}

/// The node holding the records and the keys leading to it
fn locate_records(value: &Value) -> (Vec<String>, &Value) {
    let mut path = Vec::new();
    let mut node = value;
    while let Value::Object(map) = node {
        let next: Option<(&str, &Value)> = if map.len() == 1 {
            map.iter()
                .next()
                .filter(|(_, v)| v.is_object() || v.is_array())
                .map(|(k, v)| (k.as_str(), v))
        } else {
            RECORD_KEYS
                .iter()
                .find_map(|k| map.get(*k).filter(|v| v.is_array()).map(|v| (*k, v)))
                .or_else(|| map.iter().find(|(_, v)| v.is_array()).map(|(k, v)| (k.as_str(), v)))
        };
        let Some((key, child)) = next else { break };
        path.push(key.to_string());
        node = child;
        if node.is_array() {
            break;
        }
    }
    (path, node)
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let name = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                flatten_into(&name, child, out);
            }
        }
        other => {
            let name = if prefix.is_empty() { "value" } else { prefix };
            out.push((name.to_string(), other.clone()));
        }
    }
}

fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into("", value, &mut out);
    out
}

/// Reduce a document to a table, returning the dotted path of its records
pub fn to_table(value: &Value) -> (String, Table) {
    let (path, node) = locate_records(value);
    let pairs = match node {
        Value::Array(items) if items.iter().all(Value::is_object) => items.iter().map(flatten).collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| vec![("value".to_string(), item.clone())])
            .collect(),
        other => vec![flatten(other)],
    };
    (path.join("."), Table::from_pairs(pairs))
}

fn kind_of(values: &[&Value]) -> &'static str {
    let mut kinds = values.iter().map(|v| match v {
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    });
    match kinds.next() {
        None => "empty",
        Some(first) if kinds.all(|k| k == first) => first,
        Some(_) => "mixed",
    }
}

fn summarize(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let present: Vec<&Value> = table.column(i).filter(|v| !v.is_null()).collect();
            let unique: HashSet<String> = present.iter().map(|v| table::as_text(v)).collect();
            ColumnSummary {
                name: name.clone(),
                kind: kind_of(&present).to_string(),
                unique: unique.len(),
                nulls: table.rows.len() - present.len(),
                sample: present
                    .iter()
                    .take(SAMPLE_VALUES)
                    .map(|v| table::as_text(v))
                    .collect(),
            }
        })
        .collect()
}

pub fn analyze_value(path: &Path, format: DocumentFormat, value: &Value) -> DocumentAnalysis {
    let (records_at, table) = to_table(value);
    let (numeric, non_numeric) = describe_numeric(&table, NUMERIC_SHARE);
    tracing::debug!(
        "Analyzed {}: {} rows from '{}', {} numeric columns",
        path.display(),
        table.rows.len(),
        records_at,
        numeric.len()
    );
    DocumentAnalysis {
        path: path.to_path_buf(),
        format,
        records_at,
        rows: table.rows.len(),
        columns: summarize(&table),
        non_numeric,
        numeric,
    }
}

pub fn analyze_document(path: &Path, format: DocumentFormat) -> Result<DocumentAnalysis> {
    let value = read_document(path, format)?;
    if value.is_null() {
        return Err(Error::InvalidInput(format!("{} holds no data", path.display())));
    }
    Ok(analyze_value(path, format, &value))
}

#[derive(Tabled)]
struct OverviewRow {
    #[tabled(rename = "Column")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Unique")]
    unique: usize,
    #[tabled(rename = "Nulls")]
    nulls: usize,
    #[tabled(rename = "Sample")]
    sample: String,
}

impl DocumentAnalysis {
    pub fn render_overview(&self) -> String {
        let rows: Vec<OverviewRow> = self
            .columns
            .iter()
            .map(|c| OverviewRow {
                name: c.name.clone(),
                kind: c.kind.clone(),
                unique: c.unique,
                nulls: c.nulls,
                sample: c.sample.join(", "),
            })
            .collect();
        crate::ui::render_rows(&rows)
    }

    pub fn render_stats(&self) -> String {
        render_stats(&self.numeric)
    }

    fn to_text(&self) -> String {
        let records_at = if self.records_at.is_empty() { "(root)" } else { self.records_at.as_str() };
        let mut out = format!(
            "File: {}\nRecords: {}\nRows: {}, Columns: {}\n\n",
            self.path.display(),
            records_at,
            self.rows,
            self.columns.len()
        );
        out.push_str(&self.render_overview());
        out.push_str("\n\nNumeric summary:\n");
        if self.numeric.is_empty() {
            out.push_str("No numeric columns detected.\n");
        } else {
            out.push_str(&self.render_stats());
            out.push('\n');
        }
        out
    }

    pub fn export(&self, dest: &Path, format: StatsFormat) -> Result<()> {
        let body = match format {
            StatsFormat::Json => serde_json::to_string_pretty(self)?,
            StatsFormat::Text => self.to_text(),
        };
        write_report(dest, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_records_under_preferred_key() {
        let doc = json!({
            "meta": { "source": "shop" },
            "items": [
                { "id": 1, "price": 9.5, "tags": ["a"], "owner": { "name": "ann" } },
                { "id": 2, "price": 20, "owner": { "name": "bob" } }
            ]
        });
        let (records_at, table) = to_table(&doc);
        assert_eq!(records_at, "items");
        let mut columns = table.columns.clone();
        columns.sort();
        assert_eq!(columns, vec!["id", "owner.name", "price", "tags"]);
        let tags = table.columns.iter().position(|c| c == "tags").unwrap();
        assert_eq!(table.rows[1][tags], Value::Null);
    }

    #[test]
    fn test_single_key_wrappers_are_descended() {
        let doc = json!({ "export": { "orders": [ { "qty": 1 }, { "qty": 3 } ] } });
        let (records_at, table) = to_table(&doc);
        assert_eq!(records_at, "export.orders");
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_flat_object_and_primitive_list() {
        let (records_at, table) = to_table(&json!({ "name": "cfg", "retries": 3 }));
        assert_eq!(records_at, "");
        assert_eq!(table.columns, vec!["name", "retries"]);
        assert_eq!(table.rows.len(), 1);

        let (_, table) = to_table(&json!([1, "two", 3]));
        assert_eq!(table.columns, vec!["value"]);
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn test_analyze_value_summaries() {
        let doc = json!([
            { "city": "Oslo", "temp": 10, "note": null },
            { "city": "Rome", "temp": "30" },
            { "city": "Oslo", "temp": 20 }
        ]);
        let analysis = analyze_value(Path::new("w.json"), DocumentFormat::Json, &doc);
        assert_eq!(analysis.rows, 3);

        let column = |name: &str| analysis.columns.iter().find(|c| c.name == name).unwrap();

        let city = column("city");
        assert_eq!(city.kind, "string");
        assert_eq!(city.unique, 2);
        assert_eq!(city.sample, vec!["Oslo", "Rome", "Oslo"]);

        assert_eq!(column("temp").kind, "mixed");
        assert_eq!(analysis.numeric.len(), 1);
        assert_eq!(analysis.numeric[0].column, "temp");
        assert_eq!(analysis.numeric[0].mean, 20.0);

        let note = column("note");
        assert_eq!((note.kind.as_str(), note.nulls), ("empty", 3));
        assert!(analysis.non_numeric.contains(&"note".to_string()));
    }

    #[test]
    fn test_analyze_gzipped_xml_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.xml.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(br#"<catalog><book id="1"><price>10</price></book><book id="2"><price>30</price></book></catalog>"#)
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let analysis = analyze_document(&path, DocumentFormat::Xml).unwrap();
        assert_eq!(analysis.records_at, "catalog.book");
        assert_eq!(analysis.rows, 2);
        let price = analysis.numeric.iter().find(|s| s.column == "price").unwrap();
        assert_eq!(price.max, 30.0);

        let out = dir.path().join("report.txt");
        analysis.export(&out, StatsFormat::Text).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("Records: catalog.book"));
        assert!(text.contains("Median"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(analyze_document(&path, DocumentFormat::Json), Err(Error::Json(_))));

        std::fs::write(&path, "null").unwrap();
        assert!(matches!(analyze_document(&path, DocumentFormat::Json), Err(Error::InvalidInput(_))));
    }
}
