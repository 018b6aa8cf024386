//! Saved search profiles
//!
//! A profile stores the term, the request options and the results of a search.
//! Replaying a profile filters the stored results by a new term; a profile
//! saved without results seeds a live search from its stored options instead.

use crate::search::{SearchEngine, SearchRequest, SearchResult};
use crate::storage::{IndexStore, ProfileRecord};
use crate::{Error, Result};
use serde::Serialize;

/// A decoded profile
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub name: String,
    pub request: SearchRequest,
    pub results: Vec<SearchResult>,
    pub saved_at: String,
}

impl Profile {
    fn from_record(record: ProfileRecord) -> Result<Self> {
        let mut request: SearchRequest = serde_json::from_str(&record.options_json)?;
        request.term = record.term;
        let results = if record.results_json.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&record.results_json)?
        };
        Ok(Self {
            name: record.name,
            request,
            results,
            saved_at: record.saved_at,
        })
    }
}

/// How a replay produced its results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaySource {
    Stored,
    Live,
}

pub fn save(store: &IndexStore, name: &str, request: &SearchRequest, results: &[SearchResult]) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("profile name must not be empty".to_string()));
    }
    let record = ProfileRecord {
        name: name.to_string(),
        term: request.term.clone(),
        options_json: serde_json::to_string(request)?,
        results_json: serde_json::to_string(results)?,
        saved_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    store.save_profile(&record)?;
    tracing::info!("Saved profile '{}' ({} results)", name, results.len());
    Ok(())
}

pub fn load(store: &IndexStore, name: &str) -> Result<Profile> {
    let record = store
        .get_profile(name)?
        .ok_or_else(|| Error::NotFound(format!("profile '{}'", name)))?;
    Profile::from_record(record)
}

pub fn delete(store: &IndexStore, name: &str) -> Result<()> {
    if !store.delete_profile(name)? {
        return Err(Error::NotFound(format!("profile '{}'", name)));
    }
    tracing::info!("Deleted profile '{}'", name);
    Ok(())
}

pub fn list(store: &IndexStore) -> Result<Vec<Profile>> {
    store
        .list_profiles()?
        .into_iter()
        .map(Profile::from_record)
        .collect()
}

/// Stored results whose path or snippet contains every word of `term`
pub fn filter_results(results: &[SearchResult], term: &str) -> Vec<SearchResult> {
    let words: Vec<String> = term
        .split_whitespace()
        .map(|w| w.trim_matches('"').to_lowercase())
        .filter(|w| !w.is_empty() && !matches!(w.as_str(), "and" | "or" | "not" | "near"))
        .collect();

    results
        .iter()
        .filter(|r| {
            let haystack = format!("{} {}", r.path, r.snippet).to_lowercase();
            words.iter().all(|w| haystack.contains(w.as_str()))
        })
        .cloned()
        .collect()
}

/// Replay a profile for `term` (the stored term when `None`)
pub fn replay(
    engine: &SearchEngine<'_>,
    profile: &Profile,
    term: Option<&str>,
) -> Result<(Vec<SearchResult>, ReplaySource)> {
    let term = term.unwrap_or(&profile.request.term);
    if !profile.results.is_empty() {
        return Ok((filter_results(&profile.results, term), ReplaySource::Stored));
    }

    let mut request = profile.request.clone();
    request.term = term.to_string();
    let outcome = engine.search(&request, true)?;
    Ok((outcome.results, ReplaySource::Live))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexlyConfig;
    use crate::storage::{FileMetadata, FileRecord};

    fn result(path: &str, snippet: &str) -> SearchResult {
        SearchResult {
            path: path.to_string(),
            snippet: snippet.to_string(),
            modified: "2024-01-01T00:00:00".to_string(),
            tags: Vec::new(),
            title: None,
            rank: 0.0,
        }
    }

    #[test]
    fn test_filter_results_requires_every_word() {
        let results = vec![
            result("/docs/budget-2024.md", "quarterly numbers"),
            result("/docs/notes.txt", "budget meeting notes"),
        ];
        let hits = filter_results(&results, "budget notes");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "/docs/notes.txt");
        assert_eq!(filter_results(&results, "BUDGET").len(), 2);
    }

    #[test]
    fn test_save_and_replay_stored() {
        let store = IndexStore::open_in_memory().unwrap();
        let engine = SearchEngine::new(&store, &IndexlyConfig::default());
        let mut request = SearchRequest::new("budget");
        request.limit = 7;

        save(&store, "finance", &request, &[result("/a/budget.md", "annual budget")]).unwrap();
        let profile = load(&store, "finance").unwrap();
        assert_eq!(profile.request.limit, 7);

        let (hits, source) = replay(&engine, &profile, Some("annual")).unwrap();
        assert_eq!(source, ReplaySource::Stored);
        assert_eq!(hits.len(), 1);
        let (hits, _) = replay(&engine, &profile, Some("missing")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_empty_profile_runs_live_search() {
        let store = IndexStore::open_in_memory().unwrap();
        store
            .upsert_file(
                &FileRecord {
                    path: "/x/report.txt".to_string(),
                    content: "budget report".to_string(),
                    clean_content: "budget report".to_string(),
                    modified: "2024-01-01T00:00:00".to_string(),
                    hash: "h".to_string(),
                },
                &FileMetadata {
                    path: "/x/report.txt".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let engine = SearchEngine::new(&store, &IndexlyConfig::default());

        save(&store, "live", &SearchRequest::new("budget"), &[]).unwrap();
        let profile = load(&store, "live").unwrap();
        let (hits, source) = replay(&engine, &profile, None).unwrap();
        assert_eq!(source, ReplaySource::Live);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_list_and_delete() {
        let store = IndexStore::open_in_memory().unwrap();
        save(&store, "b", &SearchRequest::new("beta"), &[]).unwrap();
        save(&store, "a", &SearchRequest::new("alpha"), &[]).unwrap();
        let names: Vec<String> = list(&store).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        delete(&store, "a").unwrap();
        assert_eq!(list(&store).unwrap().len(), 1);
        assert!(matches!(delete(&store, "a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_missing_profile() {
        let store = IndexStore::open_in_memory().unwrap();
        assert!(matches!(load(&store, "nope"), Err(Error::NotFound(_))));
        assert!(save(&store, "  ", &SearchRequest::new("x"), &[]).is_err());
    }
}
