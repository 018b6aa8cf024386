//! Pattern-based file renaming
//!
//! Names are built from `{date}`, `{title}` and `{counter}` placeholders. The
//! date comes from the modification time and the title from the slugified
//! file stem. A date prefix already present on the name is never doubled.

use crate::storage::{normalize_path, IndexStore};
use crate::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_PATTERN: &str = "{date}-{title}";
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";
pub const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%y%m%d", "%d-%m-%Y", "%d%m%Y"];
pub const COUNTER_FORMATS: &[&str] = &["d", "02d", "03d"];

/// Safety cap on conflict resolution
const MAX_COUNTER: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub pattern: String,
    pub date_format: String,
    pub counter_format: String,
    pub recursive: bool,
    pub dry_run: bool,
    /// Move the index row along with the file
    pub update_db: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            counter_format: "d".to_string(),
            recursive: false,
            dry_run: true,
            update_db: false,
        }
    }
}

impl RenameOptions {
    fn date_format(&self) -> &str {
        if DATE_FORMATS.contains(&self.date_format.as_str()) {
            &self.date_format
        } else {
            tracing::warn!("Unsupported date format '{}', using {}", self.date_format, DEFAULT_DATE_FORMAT);
            DEFAULT_DATE_FORMAT
        }
    }

    fn counter_width(&self) -> usize {
        match self.counter_format.as_str() {
            "02d" => 2,
            "03d" => 3,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameStatus {
    Renamed,
    WouldRename,
    Unchanged,
    SkippedEmpty,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub from: String,
    pub to: String,
    pub status: RenameStatus,
    pub db_updated: bool,
}

/// Lowercase, drop non-word characters, join words with single dashes
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if dash && !out.is_empty() {
                out.push('-');
            }
            dash = false;
            out.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            dash = true;
        }
    }
    out
}

/// `YYYYMMDD` or `YYYY-MM-DD` prefix followed by a dash, as compact digits
pub fn date_prefix(name: &str) -> Option<(String, usize)> {
    let bytes = name.as_bytes();
    let mut digits = String::new();
    let mut i = 0;
    for group in [4usize, 2, 2] {
        if !digits.is_empty() && bytes.get(i) == Some(&b'-') {
            i += 1;
        }
        for _ in 0..group {
            match bytes.get(i) {
                Some(b) if b.is_ascii_digit() => digits.push(*b as char),
                _ => return None,
            }
            i += 1;
        }
    }
    (bytes.get(i) == Some(&b'-')).then_some((digits, i + 1))
}

fn render(pattern: &str, date: &str, title: &str, counter: &str) -> String {
    let name = pattern
        .replace("{date}", date)
        .replace("{title}", title)
        .replace("{counter}", counter);
    // Empty placeholders leave stray dashes behind
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

/// Candidate name for `path` with the given conflict counter
pub fn candidate_name(path: &Path, modified: DateTime<Local>, options: &RenameOptions, counter: usize) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    let has_date = options.pattern.contains("{date}");
    let title = match date_prefix(&stem) {
        Some((_, len)) if has_date => slugify(&stem[len..]),
        _ => slugify(&stem),
    };
    let date = modified.format(options.date_format()).to_string();

    let counter_str = if counter == 0 {
        String::new()
    } else {
        format!("{:0width$}", counter, width = options.counter_width())
    };

    let mut name = render(&options.pattern, &date, &title, &counter_str);
    if counter > 0 && !options.pattern.contains("{counter}") {
        name = format!("{}-{}", name, counter_str);
    }
    if name.is_empty() {
        name = stem;
    }
    format!("{}{}", name, ext)
}

/// Files a target refers to, sorted
pub fn collect_files(target: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if target.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }
    if !target.is_dir() {
        return Err(Error::NotFound(target.display().to_string()));
    }
    let depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(target)
        .max_depth(depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Rename every file under `target`
pub fn rename_path(target: &Path, options: &RenameOptions, store: Option<&IndexStore>) -> Result<Vec<RenameOutcome>> {
    let files = collect_files(target, options.recursive)?;
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        outcomes.push(rename_file(&file, options, store, &mut claimed)?);
    }
    Ok(outcomes)
}

fn rename_file(
    path: &Path,
    options: &RenameOptions,
    store: Option<&IndexStore>,
    claimed: &mut HashSet<PathBuf>,
) -> Result<RenameOutcome> {
    let meta = std::fs::metadata(path)?;
    let from = path.display().to_string();
    if meta.len() == 0 {
        tracing::debug!("Keeping name of empty file {}", from);
        return Ok(RenameOutcome {
            to: from.clone(),
            from,
            status: RenameStatus::SkippedEmpty,
            db_updated: false,
        });
    }

    let modified: DateTime<Local> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Local::now());
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut counter = 0;
    let target = loop {
        let candidate = parent.join(candidate_name(path, modified, options, counter));
        if candidate == path {
            break candidate;
        }
        if !candidate.exists() && !claimed.contains(&candidate) {
            break candidate;
        }
        counter += 1;
        if counter > MAX_COUNTER {
            return Err(Error::InvalidInput(format!("no free name for {}", from)));
        }
    };

    let to = target.display().to_string();
    if target == path {
        return Ok(RenameOutcome { to, from, status: RenameStatus::Unchanged, db_updated: false });
    }
    claimed.insert(target.clone());

    if options.dry_run {
        return Ok(RenameOutcome { from, to, status: RenameStatus::WouldRename, db_updated: false });
    }

    let old_key = normalize_path(path);
    std::fs::rename(path, &target)?;
    tracing::info!("Renamed {} -> {}", from, to);

    let mut db_updated = false;
    if options.update_db {
        if let Some(store) = store {
            store.rename_path(&old_key, &normalize_path(&target))?;
            // Cached results carry the old path
            store.bump_generation()?;
            db_updated = true;
        }
    }
    Ok(RenameOutcome { from, to, status: RenameStatus::Renamed, db_updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn may_first() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Quarterly Report (Final)_v2"), "quarterly-report-final-v2");
        assert_eq!(slugify("--a  --  b--"), "a-b");
        assert_eq!(slugify("Ärger & Co"), "ärger-co");
    }

    #[test]
    fn test_date_prefix() {
        assert_eq!(date_prefix("20241007-report"), Some(("20241007".to_string(), 9)));
        assert_eq!(date_prefix("2024-10-07-report"), Some(("20241007".to_string(), 11)));
        assert_eq!(date_prefix("2024107-report"), None);
        assert_eq!(date_prefix("20241007report"), None);
    }

    #[test]
    fn test_candidate_names() {
        let opts = RenameOptions::default();
        let name = candidate_name(Path::new("/d/My Report.PDF"), may_first(), &opts, 0);
        assert_eq!(name, "20240501-my-report.pdf");

        // Existing prefix is replaced, never doubled
        let name = candidate_name(Path::new("/d/20230101-my-report.pdf"), may_first(), &opts, 0);
        assert_eq!(name, "20240501-my-report.pdf");
        let name = candidate_name(Path::new("/d/20240501-my-report.pdf"), may_first(), &opts, 0);
        assert_eq!(name, "20240501-my-report.pdf");

        let opts = RenameOptions {
            pattern: "{title}-{counter}".to_string(),
            counter_format: "03d".to_string(),
            date_format: "%d-%m-%Y".to_string(),
            ..Default::default()
        };
        assert_eq!(candidate_name(Path::new("/d/a b.txt"), may_first(), &opts, 0), "a-b.txt");
        assert_eq!(candidate_name(Path::new("/d/a b.txt"), may_first(), &opts, 7), "a-b-007.txt");

        let opts = RenameOptions {
            date_format: "%Y/%m".to_string(),
            ..Default::default()
        };
        assert_eq!(candidate_name(Path::new("/d/x.md"), may_first(), &opts, 2), "20240501-x-2.md");
    }

    #[test]
    fn test_rename_with_conflicts_and_dry_run() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Report One.txt"), "a").unwrap();
        std::fs::write(dir.path().join("report_one.txt"), "b").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();

        let opts = RenameOptions {
            pattern: "{title}".to_string(),
            ..Default::default()
        };
        let planned = rename_path(dir.path(), &opts, None).unwrap();
        assert!(planned.iter().all(|o| o.status != RenameStatus::Renamed));
        assert!(dir.path().join("Report One.txt").exists());

        let opts = RenameOptions { dry_run: false, ..opts };
        let done = rename_path(dir.path(), &opts, None).unwrap();
        let empty = done.iter().find(|o| o.from.ends_with("empty.txt")).unwrap();
        assert_eq!(empty.status, RenameStatus::SkippedEmpty);
        assert!(dir.path().join("report-one.txt").exists());
        assert!(dir.path().join("report-one-1.txt").exists());
    }

    #[test]
    fn test_rename_syncs_index() {
        use crate::storage::{FileMetadata, FileRecord};

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Old Name.txt");
        std::fs::write(&file, "budget").unwrap();
        let key = normalize_path(&file);

        let store = IndexStore::open_in_memory().unwrap();
        store
            .upsert_file(
                &FileRecord {
                    path: key.clone(),
                    content: "budget".to_string(),
                    clean_content: "budget".to_string(),
                    modified: "2024-01-01T00:00:00".to_string(),
                    hash: "h".to_string(),
                },
                &FileMetadata { path: key.clone(), ..Default::default() },
            )
            .unwrap();

        let opts = RenameOptions {
            pattern: "{title}".to_string(),
            dry_run: false,
            update_db: true,
            ..Default::default()
        };
        let out = rename_path(&file, &opts, Some(&store)).unwrap();
        assert!(out[0].db_updated);

        let new_key = normalize_path(&dir.path().join("old-name.txt"));
        assert!(store.get_file_hash(&new_key).unwrap().is_some());
        assert!(store.get_file_hash(&key).unwrap().is_none());
        let meta = store.get_metadata(&new_key).unwrap().unwrap();
        assert_eq!(meta.alias.as_deref(), Some("Old Name.txt"));
    }

    #[test]
    fn test_rename_invalidates_cached_search() {
        use crate::config::IndexlyConfig;
        use crate::search::{SearchEngine, SearchRequest};
        use crate::storage::{FileMetadata, FileRecord};

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Old Name.txt");
        std::fs::write(&file, "budget").unwrap();
        let key = normalize_path(&file);

        let store = IndexStore::open_in_memory().unwrap();
        store
            .upsert_file(
                &FileRecord {
                    path: key.clone(),
                    content: "budget".to_string(),
                    clean_content: "budget".to_string(),
                    modified: "2024-01-01T00:00:00".to_string(),
                    hash: "h".to_string(),
                },
                &FileMetadata { path: key.clone(), ..Default::default() },
            )
            .unwrap();

        let engine = SearchEngine::new(&store, &IndexlyConfig::default());
        let request = SearchRequest::new("budget");
        assert_eq!(engine.search(&request, true).unwrap().results[0].path, key);
        assert!(engine.search(&request, true).unwrap().cached);

        let opts = RenameOptions {
            pattern: "{title}".to_string(),
            dry_run: false,
            update_db: true,
            ..Default::default()
        };
        rename_path(&file, &opts, Some(&store)).unwrap();

        let outcome = engine.search(&request, true).unwrap();
        assert!(!outcome.cached);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].path, normalize_path(&dir.path().join("old-name.txt")));
    }
}
