//! Automatic cleaning of tabular data
//!
//! Date-like columns are parsed and expanded into calendar parts, numeric
//! columns are coerced, text is trimmed and gaps are filled per column type.
//! Outlier removal and min-max normalization are opt-in. A cleaned table can
//! be persisted in the index database and reused by later analyses.

use super::table::{self, Table};
use crate::storage::{normalize_path, CleanedRecord, IndexStore};
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use tabled::Tabled;

const RFC3339: &str = "rfc3339";
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    RFC3339,
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];
const DATE_NAME_HINTS: &[&str] = &["date", "time", "created", "modified", "timestamp", "recorded", "day"];
const MISSING_MARKERS: &[&str] = &["nan", "na", "n/a", "null", "none"];
const SAMPLE_CELLS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMethod {
    #[default]
    Mean,
    Median,
}

impl FillMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillMethod::Mean => "mean",
            FillMethod::Median => "median",
        }
    }
}

impl std::str::FromStr for FillMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(FillMethod::Mean),
            "median" => Ok(FillMethod::Median),
            other => Err(Error::InvalidInput(format!("unknown fill method: {} (mean or median)", other))),
        }
    }
}

/// How many calendar columns a parsed date column gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeriveLevel {
    #[default]
    All,
    Minimal,
    None,
}

impl std::str::FromStr for DeriveLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(DeriveLevel::All),
            "minimal" => Ok(DeriveLevel::Minimal),
            "none" => Ok(DeriveLevel::None),
            other => Err(Error::InvalidInput(format!(
                "unknown date derivation: {} (all, minimal or none)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub fill: FillMethod,
    pub derive_dates: DeriveLevel,
    /// Share of filled cells that must parse before a column is treated as dates
    pub date_threshold: f64,
    pub remove_outliers: bool,
    pub z_threshold: f64,
    pub normalize: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            fill: FillMethod::Mean,
            derive_dates: DeriveLevel::All,
            date_threshold: 0.6,
            remove_outliers: false,
            z_threshold: 3.0,
            normalize: false,
        }
    }
}

/// What happened to one source column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnAction {
    pub column: String,
    pub kind: String,
    pub action: String,
    pub filled: usize,
    pub strategy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub outliers_removed: usize,
    pub derived: Vec<String>,
    pub actions: Vec<ColumnAction>,
}

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Filled")]
    filled: usize,
    #[tabled(rename = "Strategy")]
    strategy: String,
}

impl CleanReport {
    pub fn render_table(&self) -> String {
        let rows: Vec<ActionRow> = self
            .actions
            .iter()
            .map(|a| ActionRow {
                column: a.column.clone(),
                kind: a.kind.clone(),
                action: a.action.clone(),
                filled: a.filled,
                strategy: a.strategy.clone(),
            })
            .collect();
        crate::ui::render_rows(&rows)
    }
}

enum Kind {
    Numeric(Vec<Option<f64>>),
    Date {
        parsed: Vec<Option<NaiveDateTime>>,
        format: &'static str,
        ratio: f64,
    },
    Text,
}

fn date_shape() -> Option<&'static Regex> {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    SHAPE
        .get_or_init(|| Regex::new(r"\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}").ok())
        .as_ref()
}

/// Trim strings and turn missing markers into null
fn normalize_cell(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
                Value::Null
            } else {
                Value::String(s.to_string())
            }
        }
        other => other.clone(),
    }
}

pub fn parse_datetime(text: &str, format: &str) -> Option<NaiveDateTime> {
    if format == RFC3339 {
        return chrono::DateTime::parse_from_rfc3339(text).ok().map(|d| d.naive_utc());
    }
    if format.contains("%H") {
        NaiveDateTime::parse_from_str(text, format).ok()
    } else {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

fn classify(name: &str, cells: &[&Value], threshold: f64) -> Kind {
    let filled: Vec<&Value> = cells.iter().copied().filter(|v| !v.is_null()).collect();
    if filled.is_empty() {
        return Kind::Text;
    }

    let numbers: Vec<Option<f64>> = cells.iter().map(|v| table::as_number(v)).collect();
    if numbers.iter().filter(|n| n.is_some()).count() == filled.len() {
        return Kind::Numeric(numbers);
    }

    let texts: Vec<String> = filled.iter().map(|v| table::as_text(v)).collect();
    let lower = name.to_lowercase();
    let hinted = DATE_NAME_HINTS.iter().any(|h| lower.contains(h));
    let shaped = date_shape()
        .map(|re| texts.iter().take(SAMPLE_CELLS).any(|t| re.is_match(t)))
        .unwrap_or(false);
    if !(hinted || shaped) {
        return Kind::Text;
    }

    let mut best: Option<(&'static str, usize)> = None;
    for format in DATE_FORMATS {
        let ok = texts.iter().filter(|t| parse_datetime(t, format).is_some()).count();
        if ok > best.map(|(_, n)| n).unwrap_or(0) {
            best = Some((*format, ok));
        }
    }
    match best {
        Some((format, ok)) if ok as f64 / filled.len() as f64 >= threshold => Kind::Date {
            parsed: cells
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    v => parse_datetime(&table::as_text(v), format),
                })
                .collect(),
            format,
            ratio: ok as f64 / filled.len() as f64,
        },
        _ => Kind::Text,
    }
}

fn fill_value(values: &[f64], method: FillMethod) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(match method {
        FillMethod::Mean => values.iter().sum::<f64>() / values.len() as f64,
        FillMethod::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            super::stats::quantile(&sorted, 0.5)
        }
    })
}

/// Most frequent value; ties resolve to the smallest
fn mode(values: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(v, _)| v.to_string())
}

fn derived_parts(name: &str, dt: &NaiveDateTime, level: DeriveLevel) -> Vec<(String, Value)> {
    let mut parts = Vec::new();
    if level != DeriveLevel::None {
        parts.push((format!("{}_year", name), Value::from(dt.year())));
        parts.push((format!("{}_month", name), Value::from(dt.month())));
        parts.push((format!("{}_day", name), Value::from(dt.day())));
        parts.push((format!("{}_weekday", name), Value::from(dt.format("%A").to_string())));
        parts.push((format!("{}_hour", name), Value::from(dt.hour())));
    }
    if level == DeriveLevel::All {
        parts.push((format!("{}_quarter", name), Value::from((dt.month() - 1) / 3 + 1)));
        parts.push((format!("{}_month_name", name), Value::from(dt.format("%B").to_string())));
        parts.push((format!("{}_week", name), Value::from(dt.iso_week().week())));
        parts.push((format!("{}_day_of_year", name), Value::from(dt.ordinal())));
        parts.push((format!("{}_minute", name), Value::from(dt.minute())));
    }
    parts.push((format!("{}_timestamp", name), Value::from(dt.and_utc().timestamp())));
    parts
}

/// Clean `source` and report what was done to every column
pub fn auto_clean(source: &Table, opts: &CleanOptions) -> Result<(Table, CleanReport)> {
    if !(opts.date_threshold > 0.0 && opts.date_threshold <= 1.0) {
        return Err(Error::InvalidInput("date threshold must be in (0, 1]".to_string()));
    }
    if opts.z_threshold <= 0.0 {
        return Err(Error::InvalidInput("outlier z threshold must be positive".to_string()));
    }

    let rows_in = source.rows.len();
    let mut rows: Vec<Vec<Value>> = source
        .rows
        .iter()
        .map(|row| row.iter().map(normalize_cell).collect())
        .collect();
    let mut actions = Vec::new();
    let mut numeric_columns = Vec::new();
    // Per row, the derived date columns in column order
    let mut derived_rows: Vec<Vec<(String, Value)>> = vec![Vec::new(); rows.len()];

    for (ci, name) in source.columns.iter().enumerate() {
        let cells: Vec<&Value> = rows.iter().map(|r| r.get(ci).unwrap_or(&Value::Null)).collect();
        let missing = cells.iter().filter(|v| v.is_null()).count();
        let kind = classify(name, &cells, opts.date_threshold);

        let action = match kind {
            Kind::Numeric(numbers) => {
                let coerced = cells.iter().any(|v| v.is_string());
                let present: Vec<f64> = numbers.iter().flatten().copied().collect();
                let fill = fill_value(&present, opts.fill);
                for (row, n) in rows.iter_mut().zip(&numbers) {
                    row[ci] = match n.or(fill) {
                        Some(v) => table::number(v),
                        None => Value::Null,
                    };
                }
                numeric_columns.push(ci);
                ColumnAction {
                    column: name.clone(),
                    kind: "numeric".to_string(),
                    action: if missing > 0 {
                        "filled missing values"
                    } else if coerced {
                        "converted to numeric"
                    } else {
                        "none"
                    }
                    .to_string(),
                    filled: missing,
                    strategy: if missing > 0 { opts.fill.as_str() } else { "-" }.to_string(),
                }
            }
            Kind::Date { parsed, format, ratio } => {
                let unparsed = parsed.iter().filter(|d| d.is_none()).count();
                let earliest = parsed.iter().flatten().min().copied();
                for ((row, derived), dt) in rows.iter_mut().zip(derived_rows.iter_mut()).zip(&parsed) {
                    let Some(dt) = dt.or(earliest) else { continue };
                    row[ci] = Value::from(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
                    derived.extend(derived_parts(name, &dt, opts.derive_dates));
                }
                ColumnAction {
                    column: name.clone(),
                    kind: "datetime".to_string(),
                    action: format!("parsed with {} ({:.0}% valid)", format, ratio * 100.0),
                    filled: unparsed,
                    strategy: if unparsed > 0 { "earliest date" } else { "-" }.to_string(),
                }
            }
            Kind::Text => {
                let present: Vec<String> = cells
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| table::as_text(v))
                    .collect();
                let (fill, strategy) = match mode(&present) {
                    Some(m) => (m, "mode"),
                    None => ("Unknown".to_string(), "Unknown"),
                };
                for row in rows.iter_mut() {
                    if row[ci].is_null() {
                        row[ci] = Value::String(fill.clone());
                    }
                }
                ColumnAction {
                    column: name.clone(),
                    kind: "text".to_string(),
                    action: if missing > 0 { "filled missing values" } else { "none" }.to_string(),
                    filled: missing,
                    strategy: if missing > 0 { strategy } else { "-" }.to_string(),
                }
            }
        };
        tracing::debug!("{}: {} ({})", action.column, action.action, action.kind);
        actions.push(action);
    }

    let mut keep = vec![true; rows.len()];
    if opts.remove_outliers {
        for &ci in &numeric_columns {
            let values: Vec<(usize, f64)> = rows
                .iter()
                .enumerate()
                .filter(|(i, _)| keep[*i])
                .filter_map(|(i, r)| table::as_number(&r[ci]).map(|v| (i, v)))
                .collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().map(|(_, v)| v).sum::<f64>() / n;
            let std = (values.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
            if std == 0.0 {
                continue;
            }
            for (i, v) in values {
                if ((v - mean) / std).abs() >= opts.z_threshold {
                    keep[i] = false;
                }
            }
        }
    }
    let outliers_removed = keep.iter().filter(|k| !**k).count();

    let mut kept: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
    let mut derived_columns: Vec<String> = Vec::new();
    for ((row, derived), keep) in rows.into_iter().zip(derived_rows).zip(keep) {
        if !keep {
            continue;
        }
        let mut row = row;
        for (name, value) in derived {
            if !derived_columns.contains(&name) {
                derived_columns.push(name.clone());
            }
            row.push(value);
        }
        kept.push(row);
    }

    if opts.normalize {
        for &ci in &numeric_columns {
            let values: Vec<f64> = kept.iter().filter_map(|r| table::as_number(&r[ci])).collect();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if values.is_empty() || min == max {
                continue;
            }
            for row in kept.iter_mut() {
                if let Some(v) = table::as_number(&row[ci]) {
                    row[ci] = table::number((v - min) / (max - min));
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let before_dedup = kept.len();
    let mut unique = Vec::with_capacity(kept.len());
    for row in kept {
        if seen.insert(serde_json::to_string(&row)?) {
            unique.push(row);
        }
    }
    let duplicates_removed = before_dedup - unique.len();

    let mut columns = source.columns.clone();
    columns.extend(derived_columns.iter().cloned());
    for row in unique.iter_mut() {
        row.resize(columns.len(), Value::Null);
    }

    tracing::info!(
        "Cleaned {} rows into {} ({} duplicates, {} outliers removed)",
        rows_in,
        unique.len(),
        duplicates_removed,
        outliers_removed
    );

    let report = CleanReport {
        rows_in,
        rows_out: unique.len(),
        duplicates_removed,
        outliers_removed,
        derived: derived_columns,
        actions,
    };
    Ok((Table { columns, rows: unique }, report))
}

// ========== Persistence ==========

pub fn save(store: &IndexStore, source: &Path, table: &Table) -> Result<()> {
    let record = CleanedRecord {
        path: normalize_path(source),
        cleaned_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        row_count: table.rows.len(),
        col_count: table.columns.len(),
        data_json: serde_json::to_string(table)?,
    };
    store.save_cleaned(&record)?;
    tracing::info!("Saved cleaned table for {} ({} rows)", record.path, record.row_count);
    Ok(())
}

pub fn load(store: &IndexStore, source: &Path) -> Result<Table> {
    let key = normalize_path(source);
    let record = store.get_cleaned(&key)?.ok_or_else(|| {
        Error::NotFound(format!("no cleaned data for {} (run with --auto-clean first)", key))
    })?;
    Ok(serde_json::from_str(&record.data_json)?)
}

/// Drop the cleaned table of `source`; false when none was stored
pub fn clear(store: &IndexStore, source: &Path) -> Result<bool> {
    store.delete_cleaned(&normalize_path(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(csv: &str) -> Table {
        let records = super::super::csv::parse(csv, ',');
        Table::from_records(records).unwrap()
    }

    fn column<'a>(t: &'a Table, name: &str) -> Vec<&'a Value> {
        let i = t.columns.iter().position(|c| c == name).unwrap();
        t.column(i).collect()
    }

    #[test]
    fn test_fill_numeric_and_text() {
        let source = table("city,temp\nOslo,10\n ,50\nRome,30\nOslo,nan\n");
        let (cleaned, report) = auto_clean(&source, &CleanOptions::default()).unwrap();

        assert_eq!(column(&cleaned, "temp"), vec![&json!(10), &json!(50), &json!(30), &json!(30)]);
        assert_eq!(column(&cleaned, "city")[1], &json!("Oslo"));
        assert_eq!(report.actions[0].strategy, "mode");
        assert_eq!(report.actions[1].strategy, "mean");
        assert_eq!(report.actions[1].filled, 1);
        assert_eq!(report.duplicates_removed, 0);
        assert!(report.render_table().contains("filled missing values"));
    }

    #[test]
    fn test_median_fill_and_duplicates() {
        let source = table("k,v\na,1\na,1\nb,2\nc,100\nd,\n");
        let opts = CleanOptions {
            fill: "median".parse().unwrap(),
            ..Default::default()
        };
        let (cleaned, report) = auto_clean(&source, &opts).unwrap();
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(cleaned.rows.len(), 4);
        assert_eq!(cleaned.rows[3], vec![json!("d"), json!(1.5)]);
    }

    #[test]
    fn test_date_column_is_parsed_and_derived() {
        let source = table("order_date,qty\n2024-03-15,1\n2024-01-02,2\n,3\n");
        let (cleaned, report) = auto_clean(&source, &CleanOptions::default()).unwrap();

        assert_eq!(column(&cleaned, "order_date")[0], &json!("2024-03-15T00:00:00"));
        // Missing dates take the earliest value
        assert_eq!(column(&cleaned, "order_date")[2], &json!("2024-01-02T00:00:00"));
        assert_eq!(column(&cleaned, "order_date_quarter")[0], &json!(1));
        assert_eq!(column(&cleaned, "order_date_weekday")[0], &json!("Friday"));
        assert_eq!(column(&cleaned, "order_date_month_name")[1], &json!("January"));
        assert_eq!(column(&cleaned, "order_date_timestamp")[1], &json!(1704153600));
        assert_eq!(report.actions[0].kind, "datetime");
        assert_eq!(report.actions[0].strategy, "earliest date");
    }

    #[test]
    fn test_derive_levels() {
        let source = table("when,x\n15/03/2024,1\n16/03/2024,2\n");
        let minimal = CleanOptions {
            derive_dates: DeriveLevel::Minimal,
            ..Default::default()
        };
        let (cleaned, _) = auto_clean(&source, &minimal).unwrap();
        assert!(cleaned.columns.contains(&"when_hour".to_string()));
        assert!(!cleaned.columns.contains(&"when_quarter".to_string()));

        let none = CleanOptions {
            derive_dates: DeriveLevel::None,
            ..Default::default()
        };
        let (cleaned, report) = auto_clean(&source, &none).unwrap();
        assert_eq!(cleaned.columns, vec!["when", "x", "when_timestamp"]);
        assert_eq!(report.derived, vec!["when_timestamp"]);
    }

    #[test]
    fn test_mostly_unparseable_dates_stay_text() {
        let source = table("date,x\n2024-01-01,1\nsoon,2\nlater,3\n");
        let (cleaned, report) = auto_clean(&source, &CleanOptions::default()).unwrap();
        assert_eq!(report.actions[0].kind, "text");
        assert_eq!(cleaned.columns.len(), 2);
    }

    #[test]
    fn test_outliers_and_normalize() {
        let mut csv = String::from("v\n");
        for v in [10, 11, 12, 10, 11, 12, 10, 11, 12, 10, 11, 1000] {
            csv.push_str(&format!("{}\n", v));
        }
        let opts = CleanOptions {
            remove_outliers: true,
            normalize: true,
            ..Default::default()
        };
        let (cleaned, report) = auto_clean(&table(&csv), &opts).unwrap();
        assert_eq!(report.outliers_removed, 1);
        // Duplicates collapse after normalization
        assert_eq!(report.duplicates_removed, 8);
        assert_eq!(column(&cleaned, "v"), vec![&json!(0), &json!(0.5), &json!(1)]);
    }

    #[test]
    fn test_invalid_options() {
        let source = table("a\n1\n");
        let opts = CleanOptions {
            date_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(auto_clean(&source, &opts), Err(Error::InvalidInput(_))));
        assert!("mode".parse::<FillMethod>().is_err());
        assert!("weekly".parse::<DeriveLevel>().is_err());
    }

    #[test]
    fn test_persist_load_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let source = table("x,y\n1,a\n2,b\n");

        assert!(matches!(load(&store, &a), Err(Error::NotFound(_))));
        save(&store, &a, &source).unwrap();
        save(&store, &b, &source).unwrap();
        assert_eq!(load(&store, &a).unwrap(), source);

        assert!(clear(&store, &a).unwrap());
        assert!(!clear(&store, &a).unwrap());
        assert!(load(&store, &a).is_err());
        assert_eq!(load(&store, &b).unwrap().rows.len(), 2);
    }
}
