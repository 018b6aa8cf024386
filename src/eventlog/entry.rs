//! Event log entries

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One indexed-file event, one NDJSON line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub event: String,
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub customer: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
}

/// Closing entry of an indexing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub timestamp: String,
    pub event: String,
    pub root: String,
    pub count: usize,
    pub duration_seconds: f64,
}

impl LogEntry {
    pub fn new(event: &str, raw_path: &str, now: DateTime<Local>) -> Self {
        let mut entry = Self::from_path(raw_path);
        entry.timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        entry.event = event.to_string();
        entry
    }

    /// Derive filename, extension and the `<YYYY>/<MM>/<customer>/<file>`
    /// layout fields from a path
    pub fn from_path(raw_path: &str) -> Self {
        let cleaned = clean_path(raw_path);
        let parts: Vec<&str> = cleaned.split('/').collect();
        let filename = parts.last().copied().unwrap_or_default();
        let extension = match filename.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => String::new(),
        };

        let (mut year, mut month, mut customer) = (None, None, None);
        if parts.len() >= 5 {
            let n = parts.len();
            let (y, m, c) = (parts[n - 4], parts[n - 3], parts[n - 2]);
            let all_digits = |s: &str| !s.is_empty() && s.chars().all(|ch| ch.is_ascii_digit());
            if y.len() == 4 && all_digits(y) && all_digits(m) {
                year = Some(y.to_string());
                month = Some(m.to_string());
                customer = Some(c.to_string());
            }
        }

        let cleaned_name = clean_filename(filename);
        let path = if parts.len() > 1 {
            format!("{}/{}", parts[..parts.len() - 1].join("/"), cleaned_name)
        } else {
            cleaned_name.clone()
        };

        Self {
            timestamp: String::new(),
            event: String::new(),
            path,
            filename: cleaned_name,
            extension,
            customer,
            year,
            month,
        }
    }
}

impl SummaryEntry {
    pub fn new(root: &str, count: usize, duration_seconds: f64, now: DateTime<Local>) -> Self {
        Self {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            event: "INDEX_SUMMARY".to_string(),
            root: clean_path(root),
            count,
            duration_seconds,
        }
    }
}

/// Backslashes to `/`, repeated slashes collapsed (except after a scheme colon)
pub fn clean_path(raw: &str) -> String {
    let replaced = raw.trim().replace('\\', "/");
    let mut out = String::with_capacity(replaced.len());
    let mut prev: Option<char> = None;
    let mut before_prev: Option<char> = None;

    for c in replaced.chars() {
        if c == '/' && prev == Some('/') && before_prev != Some(':') {
            continue;
        }
        before_prev = prev;
        prev = Some(c);
        out.push(c);
    }
    out
}

/// Whitespace runs in a file name become a single `-`
pub fn clean_filename(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}
