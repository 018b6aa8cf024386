//! Tabular analysis: CSV statistics and cleaning, JSON and XML documents

pub mod clean;
pub mod csv;
pub mod document;
pub mod stats;
pub mod table;
pub mod xml;

pub use clean::{CleanOptions, CleanReport, DeriveLevel, FillMethod};
pub use document::{DocumentAnalysis, DocumentFormat};
pub use stats::{ColumnStats, Transform};
pub use table::Table;

use crate::{Error, Result};
use serde::Serialize;
use stats::format_number;
use std::path::{Path, PathBuf};
use tabled::Tabled;

/// Share of filled CSV cells that must parse for a numeric column
const CSV_NUMERIC_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct CsvAnalysis {
    pub path: PathBuf,
    /// Absent when the rows came from a stored cleaned table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    pub rows: usize,
    pub columns: Vec<String>,
    pub non_numeric: Vec<String>,
    pub numeric: Vec<ColumnStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning: Option<CleanReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFormat {
    Json,
    Text,
}

impl std::str::FromStr for StatsFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(StatsFormat::Json),
            "txt" | "text" => Ok(StatsFormat::Text),
            other => Err(Error::InvalidInput(format!("unknown export format: {}", other))),
        }
    }
}

/// Read a CSV file into a table, returning the detected delimiter
pub fn load_csv(path: &Path) -> Result<(char, Table)> {
    let bytes = std::fs::read(path)?;
    parse_csv(path, &String::from_utf8_lossy(&bytes))
}

pub fn parse_csv(path: &Path, text: &str) -> Result<(char, Table)> {
    let delimiter = csv::detect_delimiter(text);
    let table = Table::from_records(csv::parse(text, delimiter))
        .ok_or_else(|| Error::InvalidInput(format!("{} is empty", path.display())))?;
    Ok((delimiter, table))
}

pub fn analyze_csv(path: &Path) -> Result<CsvAnalysis> {
    let (delimiter, table) = load_csv(path)?;
    Ok(analyze_table(path, Some(delimiter), &table))
}

pub fn analyze_text(path: &Path, text: &str) -> Result<CsvAnalysis> {
    let (delimiter, table) = parse_csv(path, text)?;
    Ok(analyze_table(path, Some(delimiter), &table))
}

pub fn analyze_table(path: &Path, delimiter: Option<char>, table: &Table) -> CsvAnalysis {
    let (numeric, non_numeric) = describe_numeric(table, CSV_NUMERIC_SHARE);

    tracing::debug!(
        "Analyzed {}: {} rows, {} numeric columns",
        path.display(),
        table.rows.len(),
        numeric.len()
    );

    CsvAnalysis {
        path: path.to_path_buf(),
        delimiter,
        rows: table.rows.len(),
        columns: table.columns.clone(),
        non_numeric,
        numeric,
        cleaning: None,
    }
}

/// Split columns into numeric statistics and the names of the rest.
/// A column is numeric when more than `share` of its filled cells parse.
pub(crate) fn describe_numeric(table: &Table, share: f64) -> (Vec<ColumnStats>, Vec<String>) {
    let mut numeric = Vec::new();
    let mut non_numeric = Vec::new();
    for (i, name) in table.columns.iter().enumerate() {
        let filled = table.column(i).filter(|v| !table::is_missing(v)).count();
        let values: Vec<f64> = table.column(i).filter_map(table::as_number).collect();

        if filled == 0 || values.len() as f64 <= filled as f64 * share {
            non_numeric.push(name.clone());
            continue;
        }
        let missing = table.rows.len() - values.len();
        match stats::column_stats(name, &values, missing) {
            Some(s) => numeric.push(s),
            None => non_numeric.push(name.clone()),
        }
    }
    (numeric, non_numeric)
}

pub(crate) fn write_report(dest: &Path, body: &str) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, body)?;
    Ok(())
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Missing")]
    missing: usize,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std")]
    std: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Q1")]
    q1: String,
    #[tabled(rename = "Median")]
    median: String,
    #[tabled(rename = "Q3")]
    q3: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "IQR")]
    iqr: String,
    #[tabled(rename = "Skew")]
    skew: String,
    #[tabled(rename = "Transform")]
    transform: String,
}

impl From<&ColumnStats> for StatsRow {
    fn from(s: &ColumnStats) -> Self {
        let opt = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| "-".to_string());
        Self {
            column: s.column.clone(),
            count: s.count,
            missing: s.missing,
            mean: format_number(s.mean),
            std: opt(s.std),
            min: format_number(s.min),
            q1: format_number(s.q1),
            median: format_number(s.median),
            q3: format_number(s.q3),
            max: format_number(s.max),
            iqr: format_number(s.iqr),
            skew: opt(s.skewness),
            transform: s.transform.to_string(),
        }
    }
}

pub(crate) fn render_stats(stats: &[ColumnStats]) -> String {
    let rows: Vec<StatsRow> = stats.iter().map(StatsRow::from).collect();
    crate::ui::render_rows(&rows)
}

impl CsvAnalysis {
    pub fn render_table(&self) -> String {
        render_stats(&self.numeric)
    }

    fn to_text(&self) -> String {
        let mut out = format!("File: {}\n", self.path.display());
        match self.delimiter {
            Some('\t') => out.push_str("Delimiter: \\t\n"),
            Some(d) => out.push_str(&format!("Delimiter: {}\n", d)),
            None => out.push_str("Source: cleaned table\n"),
        }
        out.push_str(&format!("Rows: {}\nColumns: {}\n", self.rows, self.columns.len()));
        if !self.non_numeric.is_empty() {
            out.push_str(&format!("Non-numeric: {}\n", self.non_numeric.join(", ")));
        }
        out.push('\n');
        out.push_str(&self.render_table());
        out.push('\n');
        out
    }

    /// Write the statistics to `dest` in the given format
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
    use tempfile::TempDir;

    const SALES: &str = "region;amount;units;note\n\
        north;$1,200;3;ok\n\
        south;$800;;late\n\
        east;$2,500;7;\n\
        west;n/a;2;ok\n";

    #[test]
    fn test_analyze_detects_numeric_columns() {
        let analysis = analyze_text(Path::new("sales.csv"), SALES).unwrap();
        assert_eq!(analysis.delimiter, Some(';'));
        assert_eq!(analysis.rows, 4);
        assert_eq!(analysis.non_numeric, vec!["region", "note"]);

        let amount = &analysis.numeric[0];
        assert_eq!(amount.column, "amount");
        assert_eq!(amount.count, 3);
        assert_eq!(amount.missing, 1);
        assert_eq!(amount.max, 2500.0);

        let units = &analysis.numeric[1];
        assert_eq!(units.count, 3);
        assert_eq!(units.missing, 1);
        assert_eq!(units.median, 3.0);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(matches!(
            analyze_text(Path::new("empty.csv"), ""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_export_json_and_text() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("data.csv");
        std::fs::write(&csv_path, "a,b\n1,x\n2,y\n10,z\n").unwrap();
        let analysis = analyze_csv(&csv_path).unwrap();

        let json_path = dir.path().join("out/stats.json");
        analysis.export(&json_path, StatsFormat::Json).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["numeric"][0]["column"], "a");
        assert_eq!(value["numeric"][0]["transform"], "sqrt");

        let txt_path = dir.path().join("stats.txt");
        analysis.export(&txt_path, "txt".parse().unwrap()).unwrap();
        let text = std::fs::read_to_string(&txt_path).unwrap();
        assert!(text.contains("Rows: 3"));
        assert!(text.contains("Median"));
    }
}
