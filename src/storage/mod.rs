//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - file_index (FTS5: path, content, clean_content, modified, hash, tag)
//! - file_metadata(path, title, author, ..., alias, format, size, semantic_json)
//! - file_tags(path, tags)
//! - search_profiles(name, term, options_json, results_json, saved_at)
//! - search_cache(cache_key, term, request_json, results_json, generation, created_at, hits)
//! - index_state(key, value)
//! - cleaned_data(path, cleaned_at, row_count, col_count, data_json)

pub mod migrate;
pub mod schema;
pub mod sqlite;

use std::path::Path;

pub use sqlite::{
    CacheEntry, CleanedRecord, DbStats, FileMetadata, FileRecord, IndexStore, IndexedRow, ProfileRecord,
    SqlFilter,
};

/// Canonical form of a path as stored in the index: absolute, `/` separated.
///
/// Existing paths are canonicalized; missing ones (deleted files) are made
/// absolute against the current directory.
pub fn normalize_path(path: &Path) -> String {
    let absolute = match std::fs::canonicalize(path) {
        Ok(p) => p,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    };
    absolute.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        let stored = normalize_path(&file);
        assert!(stored.ends_with("/a.txt"));
        assert!(!stored.contains('\\'));

        let missing = normalize_path(&dir.path().join("gone.txt"));
        assert!(missing.ends_with("gone.txt"));
    }
}
