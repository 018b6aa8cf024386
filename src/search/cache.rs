//! Search result cache keyed by the normalized request
//!
//! An entry is served only while its generation equals the index generation
//! and it is younger than the TTL. Any index write bumps the generation, so
//! stale results are never returned after re-indexing.

use super::{SearchRequest, SearchResult};
use crate::config::CacheSettings;
use crate::storage::{CacheEntry, IndexStore};
use crate::Result;

pub struct SearchCache<'a> {
    store: &'a IndexStore,
    settings: CacheSettings,
}

impl<'a> SearchCache<'a> {
    pub fn new(store: &'a IndexStore, settings: CacheSettings) -> Self {
        Self { store, settings }
    }

    /// Stable key: BLAKE3 of the canonical request JSON
    pub fn key(request: &SearchRequest) -> Result<String> {
        let canonical = serde_json::to_string(&request.normalized())?;
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    /// Fresh cached results, if any
    pub fn get(&self, request: &SearchRequest, now: i64) -> Result<Option<Vec<SearchResult>>> {
        let key = Self::key(request)?;
        let Some(entry) = self.store.get_cache(&key)? else {
            return Ok(None);
        };

        let generation = self.store.generation()?;
        if !self.is_fresh(&entry, generation, now) {
            tracing::debug!("Cache entry for '{}' is stale", entry.term);
            return Ok(None);
        }

        match serde_json::from_str(&entry.results_json) {
            Ok(results) => {
                self.store.record_cache_hit(&key)?;
                Ok(Some(results))
            }
            Err(e) => {
                tracing::warn!("Dropping unreadable cache entry: {}", e);
                Ok(None)
            }
        }
    }

    pub fn put(&self, request: &SearchRequest, results: &[SearchResult], now: i64) -> Result<()> {
        let normalized = request.normalized();
        let entry = CacheEntry {
            key: Self::key(request)?,
            term: normalized.term.clone(),
            request_json: serde_json::to_string(&normalized)?,
            results_json: serde_json::to_string(results)?,
            generation: self.store.generation()?,
            created_at: now,
            hits: 0,
        };
        self.store.put_cache(&entry)?;
        self.store.prune_cache(self.settings.max_entries)?;
        Ok(())
    }

    pub fn is_fresh(&self, entry: &CacheEntry, generation: i64, now: i64) -> bool {
        entry.generation == generation && now - entry.created_at < self.settings.ttl_secs as i64
    }

    /// Stale entries to recompute, capped by `max_refresh_entries`
    pub fn stale_requests(&self, now: i64) -> Result<Vec<SearchRequest>> {
        let generation = self.store.generation()?;
        let older_than = now - self.settings.ttl_secs as i64;
        let entries =
            self.store
                .stale_cache_entries(generation, older_than, self.settings.max_refresh_entries)?;

        Ok(entries
            .into_iter()
            .filter_map(|e| match serde_json::from_str::<SearchRequest>(&e.request_json) {
                Ok(req) => Some(req),
                Err(err) => {
                    tracing::debug!("Skipping unreadable cached request: {}", err);
                    None
                }
            })
            .collect())
    }

    pub fn clear(&self) -> Result<usize> {
        self.store.clear_cache()
    }

    pub fn prune(&self) -> Result<usize> {
        self.store.prune_cache(self.settings.max_entries)
    }
}
