//! Search: query parsing, ranking, snippets and result caching

pub mod cache;
pub mod engine;
pub mod fuzzy;
pub mod query;
pub mod snippet;

pub use cache::SearchCache;
pub use engine::{SearchEngine, SearchOutcome};
pub use query::{ParsedQuery, RenderOptions};

use crate::storage::SqlFilter;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Fts,
    Regex,
}

/// Result filters shared by FTS and regex search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Extensions without the dot
    pub filetypes: Vec<String>,
    /// Inclusive `YYYY-MM-DD` or ISO timestamp bounds on the modified time
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub path_contains: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub format: Option<String>,
}

impl SearchFilters {
    fn normalized(&self) -> Self {
        let mut filetypes: Vec<String> = self
            .filetypes
            .iter()
            .map(|f| f.trim().trim_start_matches('.').to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        filetypes.sort();
        filetypes.dedup();

        let clean = |v: &Option<String>| {
            v.as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            filetypes,
            date_from: clean(&self.date_from),
            date_to: clean(&self.date_to),
            path_contains: clean(&self.path_contains),
            tag: clean(&self.tag),
            author: clean(&self.author),
            format: clean(&self.format).map(|f| f.trim_start_matches('.').to_lowercase()),
        }
    }

    /// SQL conditions over `file_index` / `file_metadata`
    pub fn to_sql(&self) -> Result<SqlFilter> {
        let f = self.normalized();
        let mut sql = SqlFilter::default();

        if !f.filetypes.is_empty() {
            let clause = vec!["file_index.path LIKE ?"; f.filetypes.len()].join(" OR ");
            sql.clauses.push(clause);
            for ext in &f.filetypes {
                sql.params.push(format!("%.{}", ext).into());
            }
        }
        if let Some(from) = &f.date_from {
            check_date(from)?;
            sql.push("file_index.modified >= ?", from.clone());
        }
        if let Some(to) = &f.date_to {
            check_date(to)?;
            let bound = if to.len() == 10 {
                format!("{}T23:59:59", to)
            } else {
                to.clone()
            };
            sql.push("file_index.modified <= ?", bound);
        }
        if let Some(path) = &f.path_contains {
            sql.push("file_index.path LIKE ?", format!("%{}%", path.replace('\\', "/")));
        }
        if let Some(tag) = &f.tag {
            sql.push("file_index.tag LIKE ?", format!("%{}%", tag));
        }
        if let Some(author) = &f.author {
            sql.push("file_metadata.author LIKE ?", format!("%{}%", author));
        }
        if let Some(format) = &f.format {
            sql.push("lower(file_metadata.format) = ?", format.clone());
        }
        Ok(sql)
    }
}

fn check_date(value: &str) -> Result<()> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| Error::InvalidInput(format!("invalid date '{}' (expected YYYY-MM-DD)", value)))
}

/// Everything that determines a result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub term: String,
    pub mode: SearchMode,
    pub filters: SearchFilters,
    pub limit: usize,
    pub context_chars: usize,
    /// Only match human text (`clean_content`)
    pub clean: bool,
    pub fuzzy: bool,
    pub fuzzy_threshold: u8,
    pub near_distance: usize,
}

impl Default for SearchRequest {
    fn default() -> Self {
        let settings = crate::config::SearchSettings::default();
        Self {
            term: String::new(),
            mode: SearchMode::Fts,
            filters: SearchFilters::default(),
            limit: settings.limit,
            context_chars: settings.context_chars,
            clean: false,
            fuzzy: false,
            fuzzy_threshold: settings.fuzzy_threshold,
            near_distance: settings.near_distance,
        }
    }
}

impl SearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            term: pattern.into(),
            mode: SearchMode::Regex,
            ..Default::default()
        }
    }

    /// Canonical form used for cache keys: term whitespace collapsed, filters
    /// sorted, irrelevant knobs reset
    pub fn normalized(&self) -> Self {
        let term = match self.mode {
            SearchMode::Fts => self.term.split_whitespace().collect::<Vec<_>>().join(" "),
            SearchMode::Regex => self.term.trim().to_string(),
        };
        let fuzzy = self.fuzzy && self.mode == SearchMode::Fts;
        Self {
            term,
            mode: self.mode,
            filters: self.filters.normalized(),
            limit: self.limit,
            context_chars: self.context_chars,
            clean: self.clean && self.mode == SearchMode::Fts,
            fuzzy,
            fuzzy_threshold: if fuzzy { self.fuzzy_threshold.min(100) } else { 0 },
            near_distance: self.near_distance,
        }
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub snippet: String,
    pub modified: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// bm25 score, lower is better (0 for regex hits)
    #[serde(default)]
    pub rank: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_request_is_stable() {
        let mut a = SearchRequest::new("  budget   review ");
        a.filters.filetypes = vec![".MD".to_string(), "txt".to_string()];
        let mut b = SearchRequest::new("budget review");
        b.filters.filetypes = vec!["txt".to_string(), "md".to_string(), "md".to_string()];

        assert_eq!(a.normalized(), b.normalized());
        assert_eq!(SearchCache::key(&a).unwrap(), SearchCache::key(&b).unwrap());

        let mut c = b.clone();
        c.limit = 5;
        assert_ne!(SearchCache::key(&b).unwrap(), SearchCache::key(&c).unwrap());
    }

    #[test]
    fn test_filters_to_sql() {
        let filters = SearchFilters {
            filetypes: vec!["md".into(), "txt".into()],
            date_to: Some("2024-05-31".into()),
            path_contains: Some("reports".into()),
            ..Default::default()
        };
        let sql = filters.to_sql().unwrap();
        assert_eq!(sql.clauses[0], "file_index.path LIKE ? OR file_index.path LIKE ?");
        assert_eq!(sql.params.len(), 4);
        assert!(sql.clauses.contains(&"file_index.modified <= ?".to_string()));
    }

    #[test]
    fn test_invalid_date_rejected() {
        let filters = SearchFilters {
            date_from: Some("May 1st".into()),
            ..Default::default()
        };
        assert!(matches!(filters.to_sql(), Err(Error::InvalidInput(_))));
    }
}
