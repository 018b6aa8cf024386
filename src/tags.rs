//! Tagging files and folders

use crate::storage::{normalize_path, IndexStore};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    Add,
    Remove,
}

/// Tags of one file after an update
#[derive(Debug, Clone, Serialize)]
pub struct TaggedFile {
    pub path: String,
    pub tags: Vec<String>,
}

/// Indexed files a target refers to: the file itself, or the files of a folder
pub fn resolve_targets(store: &IndexStore, target: &Path, recursive: bool) -> Result<Vec<String>> {
    let key = normalize_path(target);
    if !target.is_dir() {
        if !target.exists() && store.get_file_hash(&key)?.is_none() {
            return Err(Error::NotFound(target.display().to_string()));
        }
        return Ok(vec![key]);
    }

    let prefix = format!("{}/", key.trim_end_matches('/'));
    let mut paths: Vec<String> = store
        .hashes_under(&key)?
        .into_keys()
        .filter(|p| recursive || !p[prefix.len().min(p.len())..].contains('/'))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Add or remove `tags` on every target
pub fn apply(
    store: &IndexStore,
    targets: &[impl AsRef<Path>],
    tags: &[String],
    action: TagAction,
    recursive: bool,
) -> Result<Vec<TaggedFile>> {
    if tags.iter().all(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput("no tags given".to_string()));
    }

    let mut updated = Vec::new();
    store.begin_transaction()?;
    for target in targets {
        let paths = match resolve_targets(store, target.as_ref(), recursive) {
            Ok(p) => p,
            Err(e) => {
                store.rollback().ok();
                return Err(e);
            }
        };
        for path in paths {
            let result = match action {
                TagAction::Add => store.add_tags(&path, tags),
                TagAction::Remove => store.remove_tags(&path, tags),
            };
            match result {
                Ok(tags) => updated.push(TaggedFile { path, tags }),
                Err(e) => {
                    store.rollback().ok();
                    return Err(e);
                }
            }
        }
    }
    // Cached results carry tags
    if !updated.is_empty() {
        if let Err(e) = store.bump_generation() {
            store.rollback().ok();
            return Err(e);
        }
    }
    store.commit()?;
    tracing::info!("Updated tags on {} files", updated.len());
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileMetadata, FileRecord};
    use tempfile::TempDir;

    fn index(store: &IndexStore, path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "content").unwrap();
        let key = normalize_path(path);
        store
            .upsert_file(
                &FileRecord {
                    path: key.clone(),
                    content: "content".to_string(),
                    clean_content: "content".to_string(),
                    modified: "2024-01-01T00:00:00".to_string(),
                    hash: "h".to_string(),
                },
                &FileMetadata {
                    path: key,
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_folder_tagging_recursive_and_flat() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let top = dir.path().join("a.txt");
        let nested = dir.path().join("sub").join("b.txt");
        index(&store, &top);
        index(&store, &nested);

        let flat = apply(&store, &[dir.path()], &["work".to_string()], TagAction::Add, false).unwrap();
        assert_eq!(flat.len(), 1);
        assert!(store.get_tags(&normalize_path(&nested)).unwrap().is_empty());

        let deep = apply(&store, &[dir.path()], &["work".to_string()], TagAction::Add, true).unwrap();
        assert_eq!(deep.len(), 2);
        assert_eq!(store.get_tags(&normalize_path(&nested)).unwrap(), vec!["work"]);

        apply(&store, &[&top], &["work".to_string()], TagAction::Remove, false).unwrap();
        assert!(store.get_tags(&normalize_path(&top)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_target() {
        let store = IndexStore::open_in_memory().unwrap();
        let err = apply(&store, &["/no/such/file.txt"], &["x".to_string()], TagAction::Add, false);
        assert!(matches!(err, Err(Error::NotFound(_))));
    }
}
