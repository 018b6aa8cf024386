//! Search engine implementation
//!
//! Provides high-level search operations:
//! - FTS5 search with bm25 ranking, `--clean` column restriction and fuzzy expansion
//! - Regex search through the `REGEXP` SQL function
//! - Cached execution and cache refresh

use super::cache::SearchCache;
use super::fuzzy;
use super::query::{ParsedQuery, RenderOptions};
use super::snippet;
use super::{SearchMode, SearchRequest, SearchResult};
use crate::config::IndexlyConfig;
use crate::storage::sqlite::split_tags;
use crate::storage::{IndexStore, IndexedRow};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Results plus where they came from
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub cached: bool,
}

/// Search engine over an [`IndexStore`]
pub struct SearchEngine<'a> {
    store: &'a IndexStore,
    cache: SearchCache<'a>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a IndexStore, config: &IndexlyConfig) -> Self {
        Self {
            store,
            cache: SearchCache::new(store, config.cache.clone()),
        }
    }

    pub fn cache(&self) -> &SearchCache<'a> {
        &self.cache
    }

    /// Run a request, consulting the cache unless `use_cache` is false
    pub fn search(&self, request: &SearchRequest, use_cache: bool) -> Result<SearchOutcome> {
        let now = chrono::Utc::now().timestamp();

        if use_cache {
            if let Some(results) = self.cache.get(request, now)? {
                tracing::debug!("Cache hit for '{}'", request.term);
                return Ok(SearchOutcome { results, cached: true });
            }
        }

        let results = self.execute(request)?;
        if use_cache {
            self.cache.put(request, &results, now)?;
        }
        Ok(SearchOutcome { results, cached: false })
    }

    /// Run a request against the index, bypassing the cache
    pub fn execute(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let request = request.normalized();
        if request.term.is_empty() {
            return Err(Error::Query("empty search term".to_string()));
        }
        match request.mode {
            SearchMode::Fts => self.execute_fts(&request),
            SearchMode::Regex => self.execute_regex(&request),
        }
    }

    fn execute_fts(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let parsed = ParsedQuery::parse(&request.term)?;

        let expansions = if request.fuzzy {
            Some(self.fuzzy_expansions(&parsed, request.fuzzy_threshold)?)
        } else {
            None
        };

        let match_expr = parsed.to_fts(&RenderOptions {
            near_distance: request.near_distance,
            column: request.clean.then_some("clean_content"),
            expansions: expansions.as_ref(),
        });
        tracing::debug!("MATCH {}", match_expr);

        let mut terms = parsed.terms();
        if let Some(exp) = &expansions {
            terms.extend(exp.values().flatten().cloned());
        }

        let filter = request.filters.to_sql()?;
        let rows = self.store.search_fts(&match_expr, &filter, request.limit)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let snippet = snippet::make_snippet(&row.content, &terms, request.context_chars);
                to_result(row, snippet)
            })
            .collect())
    }

    fn fuzzy_expansions(&self, parsed: &ParsedQuery, threshold: u8) -> Result<HashMap<String, Vec<String>>> {
        let mut expansions = HashMap::new();
        for word in parsed.bare_words() {
            let Some(first) = word.chars().next() else {
                continue;
            };
            let vocab = self.store.vocabulary(first, fuzzy::VOCAB_SCAN)?;
            let alts = fuzzy::expand(&word, &vocab, threshold);
            if !alts.is_empty() {
                tracing::debug!("Fuzzy '{}' -> {:?}", word, alts);
                expansions.insert(word, alts);
            }
        }
        Ok(expansions)
    }

    fn execute_regex(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let re = regex::RegexBuilder::new(&request.term)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Query(format!("invalid regex: {}", e)))?;

        let filter = request.filters.to_sql()?;
        let rows = self.store.search_regex(&request.term, &filter, request.limit)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let hit = re.find(&row.content).map(|m| {
                    let start = row.content[..m.start()].chars().count();
                    (start, m.as_str().chars().count())
                });
                let snippet = snippet::window(&row.content, hit, request.context_chars);
                to_result(row, snippet)
            })
            .collect())
    }

    /// Recompute stale cached searches; returns how many were refreshed
    pub fn refresh_cache(&self) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut refreshed = 0;
        for request in self.cache.stale_requests(now)? {
            match self.execute(&request) {
                Ok(results) => {
                    self.cache.put(&request, &results, now)?;
                    refreshed += 1;
                }
                Err(e) => tracing::warn!("Could not refresh '{}': {}", request.term, e),
            }
        }
        Ok(refreshed)
    }
}

fn to_result(row: IndexedRow, snippet: String) -> SearchResult {
    SearchResult {
        tags: split_tags(&row.tag),
        path: row.path,
        snippet,
        modified: row.modified,
        title: row.title,
        rank: row.rank,
    }
}
