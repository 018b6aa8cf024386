//! Per-file work done off the coordinator thread: read, hash, extract

use crate::extract::{self, ExtractorRegistry, SkipReason};
use crate::{FileStatus, IndexMessage};
use std::path::Path;

/// Read, hash and extract one file.
///
/// `known_hash` is the hash stored for the path, if any. Matching hashes
/// short-circuit to `Unchanged` without running an extractor.
pub fn process_file(
    registry: &ExtractorRegistry,
    path: &Path,
    stored_path: String,
    known_hash: Option<&str>,
    max_size: u64,
) -> IndexMessage {
    let Some(extractor) = registry.find(path) else {
        return IndexMessage::Skipped(stored_path, SkipReason::Unsupported);
    };

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return IndexMessage::Error(stored_path, e.to_string()),
    };
    if meta.len() > max_size {
        return IndexMessage::Skipped(stored_path, SkipReason::TooLarge);
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return IndexMessage::Error(stored_path, e.to_string()),
    };
    let hash = blake3::hash(&bytes).to_hex().to_string();

    let status = match known_hash {
        Some(h) if h == hash => {
            return IndexMessage::Processed {
                path: stored_path,
                hash,
                document: None,
                status: FileStatus::Unchanged,
            };
        }
        Some(_) => FileStatus::Modified,
        None => FileStatus::New,
    };

    match extract::extract_bytes(extractor, path, &bytes, &meta) {
        Ok(document) => IndexMessage::Processed {
            path: stored_path,
            hash,
            document: Some(document),
            status,
        },
        Err(reason) => IndexMessage::Skipped(stored_path, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::default_registry;

    #[test]
    fn test_new_then_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let registry = default_registry();

        let first = process_file(&registry, &path, "a".into(), None, 1024);
        let hash = match first {
            IndexMessage::Processed { status: FileStatus::New, hash, document: Some(doc), .. } => {
                assert_eq!(doc.text, "hello");
                hash
            }
            other => panic!("unexpected {:?}", other),
        };

        let second = process_file(&registry, &path, "a".into(), Some(&hash), 1024);
        assert!(matches!(
            second,
            IndexMessage::Processed { status: FileStatus::Unchanged, document: None, .. }
        ));

        let third = process_file(&registry, &path, "a".into(), Some("stale"), 1024);
        assert!(matches!(third, IndexMessage::Processed { status: FileStatus::Modified, .. }));
    }

    #[test]
    fn test_missing_file_is_error() {
        let registry = default_registry();
        let msg = process_file(&registry, Path::new("/nonexistent/x.txt"), "x".into(), None, 1024);
        assert!(matches!(msg, IndexMessage::Error(..)));
    }
}
