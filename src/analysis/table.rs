//! Row-major table shared by CSV, JSON and XML analysis

use super::csv;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header plus rows of JSON cells; every row has one cell per column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build from parsed CSV records, the first being the header.
    /// Blank header cells are named `column_N`; short rows are padded with null.
    pub fn from_records(records: Vec<Vec<String>>) -> Option<Self> {
        let mut records = records.into_iter();
        let header = records.next()?;
        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() { format!("column_{}", i + 1) } else { h.to_string() }
            })
            .collect();

        let rows = records
            .map(|record| {
                (0..columns.len())
                    .map(|i| match record.get(i) {
                        Some(cell) if !cell.trim().is_empty() => Value::String(cell.clone()),
                        _ => Value::Null,
                    })
                    .collect()
            })
            .collect();
        Some(Self { columns, rows })
    }

    /// Build from rows of `(column, value)` pairs; columns keep first-seen order
    pub fn from_pairs(pairs: Vec<Vec<(String, Value)>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &pairs {
            for (name, _) in row {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        let rows = pairs
            .into_iter()
            .map(|row| {
                let mut cells = vec![Value::Null; columns.len()];
                for (name, value) in row {
                    if let Some(i) = columns.iter().position(|c| *c == name) {
                        cells[i] = value;
                    }
                }
                cells
            })
            .collect();
        Self { columns, rows }
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| row.get(index).unwrap_or(&Value::Null))
    }
}

pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numeric reading of a cell; strings go through the CSV number rules
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => csv::parse_number(s),
        _ => None,
    }
}

pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON number for `v`, integral when it has no fractional part
pub fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_pads_and_names_columns() {
        let table = Table::from_records(vec![
            vec!["a".into(), "".into()],
            vec!["1".into()],
            vec!["2".into(), " ".into()],
        ])
        .unwrap();
        assert_eq!(table.columns, vec!["a", "column_2"]);
        assert_eq!(table.rows[0], vec![json!("1"), Value::Null]);
        assert_eq!(table.rows[1][1], Value::Null);
        assert!(Table::from_records(Vec::new()).is_none());
    }

    #[test]
    fn test_from_pairs_keeps_first_seen_order() {
        let table = Table::from_pairs(vec![
            vec![("id".into(), json!(1)), ("name".into(), json!("a"))],
            vec![("name".into(), json!("b")), ("extra".into(), json!(true))],
        ]);
        assert_eq!(table.columns, vec!["id", "name", "extra"]);
        assert_eq!(table.rows[1], vec![Value::Null, json!("b"), json!(true)]);
    }

    #[test]
    fn test_cell_readings() {
        assert_eq!(as_number(&json!("$1,200")), Some(1200.0));
        assert_eq!(as_number(&json!(2.5)), Some(2.5));
        assert_eq!(as_number(&json!(true)), None);
        assert!(is_missing(&json!("  ")));
        assert_eq!(as_text(&json!([1, 2])), "[1,2]");
        assert_eq!(number(3.0), json!(3));
        assert_eq!(number(2.5), json!(2.5));
    }
}
