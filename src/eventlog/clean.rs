//! `logs clean`: merge, dedupe and export event logs

use super::entry::{LogEntry, TIMESTAMP_FORMAT};
use super::writer::{log_file_date, LOG_SUFFIX};
use crate::{Error, Result};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Ndjson,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Ndjson => "ndjson",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ndjson" => Ok(ExportFormat::Ndjson),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::InvalidInput(format!("unknown export format '{}'", other))),
        }
    }
}

/// Per-log metadata
#[derive(Debug, Clone, Serialize)]
pub struct LogMeta {
    pub log_date: String,
    pub file_count: usize,
    pub earliest_timestamp: Option<String>,
    pub latest_timestamp: Option<String>,
    pub log_hash: String,
    pub source_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub written: Vec<PathBuf>,
    pub summary: PathBuf,
    pub entries: usize,
}

pub struct CleanOptions<'a> {
    pub format: ExportFormat,
    pub out: Option<&'a Path>,
    pub combine: bool,
    pub dedupe: bool,
}

/// A single file, or every event log in a directory (sorted by name)
pub fn collect_log_files(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.exists() {
        return Err(Error::NotFound(source.display().to_string()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(source)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains(LOG_SUFFIX) && n.ends_with(".ndjson"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Parse one log file. NDJSON entries and legacy `[ts] [EVENT] path` lines are
/// both accepted; summary lines are skipped.
pub fn parse_log_file(path: &Path) -> Result<(Vec<LogEntry>, LogMeta)> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut entries = Vec::new();
    let mut earliest: Option<NaiveDateTime> = None;
    let mut latest: Option<NaiveDateTime> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry = if line.starts_with('{') {
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entry,
                Err(_) => continue,
            }
        } else {
            parse_legacy_line(line)
        };

        if let Some(ts) = parse_timestamp(&entry.timestamp) {
            earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
            latest = Some(latest.map_or(ts, |l| l.max(ts)));
        }
        entries.push(entry);
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let meta = LogMeta {
        log_date: log_file_date(path)
            .map(|d| d.to_string())
            .unwrap_or_else(|| stem.split('_').next().unwrap_or(stem).to_string()),
        file_count: entries.len(),
        earliest_timestamp: earliest.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        latest_timestamp: latest.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        log_hash: blake3::hash(&bytes).to_hex().to_string(),
        source_path: path.display().to_string(),
    };

    Ok((entries, meta))
}

fn parse_legacy_line(line: &str) -> LogEntry {
    let raw_path = match line.rfind("] ") {
        Some(pos) => line[pos + 2..].trim(),
        None => line,
    };
    let mut entry = LogEntry::from_path(raw_path);
    if let Some(rest) = line.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            entry.timestamp = rest[..end].to_string();
        }
    }
    if let Some(start) = line.find("] [") {
        let rest = &line[start + 3..];
        if let Some(end) = rest.find(']') {
            entry.event = rest[..end].to_string();
        }
    }
    entry
}

fn parse_timestamp(ts: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Keep the first entry per path
pub fn dedupe_entries(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| {
            let key = if e.path.is_empty() { e.filename.clone() } else { e.path.clone() };
            seen.insert(key)
        })
        .collect()
}

pub fn clean_logs(source: &Path, opts: &CleanOptions<'_>) -> Result<CleanReport> {
    let files = collect_log_files(source)?;
    if files.is_empty() {
        return Err(Error::NotFound(format!("no event logs in {}", source.display())));
    }

    let mut metas = Vec::new();
    let mut all_entries = Vec::new();
    let mut written = Vec::new();
    let combine = opts.combine && files.len() > 1;

    for file in &files {
        let (entries, meta) = parse_log_file(file)?;

        if !combine {
            let out_file = individual_output(file, opts, files.len() == 1)?;
            let payload = serde_json::json!({
                "timestamp": Local::now().format(TIMESTAMP_FORMAT).to_string(),
                "total_files": entries.len(),
                "files": &entries,
                "log_meta": &meta,
            });
            export(&out_file, opts.format, &entries, &payload)?;
            written.push(out_file);
        }

        metas.push(meta);
        all_entries.extend(entries);
    }

    let mut entry_total = all_entries.len();
    if combine {
        let combined = if opts.dedupe {
            dedupe_entries(all_entries.clone())
        } else {
            all_entries.clone()
        };
        entry_total = combined.len();

        let out_file = match opts.out {
            Some(out) if out.is_dir() || out.extension().is_none() => {
                std::fs::create_dir_all(out)?;
                out.join(format!("index-cleaned-all.{}", opts.format.extension()))
            }
            Some(out) => out.to_path_buf(),
            None => source.join(format!("index-cleaned-all.{}", opts.format.extension())),
        };
        let payload = serde_json::json!({
            "timestamp": Local::now().format(TIMESTAMP_FORMAT).to_string(),
            "total_files": combined.len(),
            "files": &combined,
            "combined_meta": {
                "source_count": files.len(),
                "entry_count": combined.len(),
            },
            "per_log_meta": &metas,
        });
        export(&out_file, opts.format, &combined, &payload)?;
        written.push(out_file);
    }

    let summary_dir = written
        .first()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source.to_path_buf());
    let summary = summary_dir.join("summary.txt");
    std::fs::write(&summary, render_summary(&metas, &all_entries))?;

    Ok(CleanReport {
        written,
        summary,
        entries: entry_total,
    })
}

fn individual_output(file: &Path, opts: &CleanOptions<'_>, single: bool) -> Result<PathBuf> {
    let date = log_file_date(file)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "log".to_string());
    let name = format!("{}_cleaned.{}", date, opts.format.extension());

    let out = match opts.out {
        Some(out) if single && out.extension().is_some() => out.to_path_buf(),
        Some(out) => {
            std::fs::create_dir_all(out)?;
            out.join(name)
        }
        None => file.with_file_name(name),
    };
    Ok(out)
}

fn export(path: &Path, format: ExportFormat, entries: &[LogEntry], payload: &serde_json::Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut file, payload)?;
            writeln!(file)?;
        }
        ExportFormat::Ndjson => {
            for entry in entries {
                writeln!(file, "{}", serde_json::to_string(entry)?)?;
            }
        }
        ExportFormat::Csv => {
            writeln!(file, "timestamp,event,path,filename,extension,customer,year,month")?;
            for e in entries {
                let fields = [
                    e.timestamp.as_str(),
                    e.event.as_str(),
                    e.path.as_str(),
                    e.filename.as_str(),
                    e.extension.as_str(),
                    e.customer.as_deref().unwrap_or(""),
                    e.year.as_deref().unwrap_or(""),
                    e.month.as_deref().unwrap_or(""),
                ];
                let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
                writeln!(file, "{}", row.join(","))?;
            }
        }
    }
    file.flush()?;
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or newline
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_summary(metas: &[LogMeta], entries: &[LogEntry]) -> String {
    let mut lines = vec![
        format!("Generated at: {}", Local::now().format(TIMESTAMP_FORMAT)),
        format!("Processed logs: {}", metas.len()),
        format!(
            "Total entries across logs: {}",
            metas.iter().map(|m| m.file_count).sum::<usize>()
        ),
        String::new(),
    ];

    for m in metas {
        lines.push(format!("- {} : {} entries (hash: {})", m.log_date, m.file_count, m.log_hash));
        if m.earliest_timestamp.is_some() || m.latest_timestamp.is_some() {
            lines.push(format!(
                "    earliest: {}  latest: {}",
                m.earliest_timestamp.as_deref().unwrap_or("-"),
                m.latest_timestamp.as_deref().unwrap_or("-")
            ));
        }
    }
    lines.push(String::new());

    let mut customers: HashMap<&str, usize> = HashMap::new();
    for e in entries {
        *customers.entry(e.customer.as_deref().unwrap_or("UNKNOWN")).or_insert(0) += 1;
    }
    let mut customers: Vec<(&str, usize)> = customers.into_iter().collect();
    customers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    lines.push("Top customers by indexed file count:".to_string());
    for (customer, count) in customers.into_iter().take(20) {
        lines.push(format!("  {}: {}", customer, count));
    }
    lines.push(String::new());

    let unique: HashSet<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    lines.push(format!(
        "Duplicate path occurrences across inputs: {}",
        entries.len() - unique.len()
    ));
    lines.push(String::new());
    lines.join("\n")
}
