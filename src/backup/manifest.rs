//! Backup manifests: relative path -> content fingerprint

use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    File { hash: String, size: u64, mtime: f64 },
    Deleted { deleted: bool },
}

impl ManifestEntry {
    pub fn is_deleted(&self) -> bool {
        matches!(self, ManifestEntry::Deleted { deleted: true })
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            ManifestEntry::File { hash, .. } => Some(hash),
            ManifestEntry::Deleted { .. } => None,
        }
    }
}

pub type Manifest = BTreeMap<String, ManifestEntry>;

/// Streaming SHA-256 of a file, hex encoded
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint every file under `source`, keyed by `/`-separated relative path
pub fn build_manifest(source: &Path) -> Result<Manifest> {
    let mut manifest = Manifest::new();
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let meta = entry.metadata()?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        manifest.insert(
            relative,
            ManifestEntry::File {
                hash: sha256_file(entry.path())?,
                size: meta.len(),
                mtime,
            },
        );
    }
    Ok(manifest)
}

/// New or modified files of `current`, and live paths of `previous` that are gone
pub fn diff_manifests(previous: &Manifest, current: &Manifest) -> (Manifest, Vec<String>) {
    let changed: Manifest = current
        .iter()
        .filter(|(path, entry)| match previous.get(*path) {
            Some(prev) => prev.hash() != entry.hash(),
            None => true,
        })
        .map(|(path, entry)| (path.clone(), entry.clone()))
        .collect();

    let deleted = previous
        .iter()
        .filter(|(path, entry)| !entry.is_deleted() && !current.contains_key(*path))
        .map(|(path, _)| path.clone())
        .collect();

    (changed, deleted)
}

/// `previous` updated with `changed` and tombstones for `deleted`
pub fn merge(previous: &Manifest, changed: &Manifest, deleted: &[String]) -> Manifest {
    let mut merged = previous.clone();
    merged.extend(changed.iter().map(|(k, v)| (k.clone(), v.clone())));
    for path in deleted {
        merged.insert(path.clone(), ManifestEntry::Deleted { deleted: true });
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_and_diff() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "b").unwrap();

        let first = build_manifest(dir.path()).unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.contains_key("sub/b.txt"));
        assert_eq!(
            first["a.txt"].hash(),
            Some("ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb")
        );

        std::fs::write(dir.path().join("a.txt"), "changed").unwrap();
        std::fs::remove_file(dir.path().join("sub/b.txt")).unwrap();
        std::fs::write(dir.path().join("c.txt"), "c").unwrap();
        let second = build_manifest(dir.path()).unwrap();

        let (changed, deleted) = diff_manifests(&first, &second);
        assert_eq!(changed.keys().collect::<Vec<_>>(), vec!["a.txt", "c.txt"]);
        assert_eq!(deleted, vec!["sub/b.txt".to_string()]);

        let merged = merge(&first, &changed, &deleted);
        assert!(merged["sub/b.txt"].is_deleted());

        // Tombstones are not reported as deleted twice
        let (_, again) = diff_manifests(&merged, &second);
        assert!(again.is_empty());
    }

    #[test]
    fn test_entry_json_shapes() {
        let json = r#"{"x": {"hash": "ab", "size": 2, "mtime": 1.5}, "y": {"deleted": true}}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest["x"].hash(), Some("ab"));
        assert!(manifest["y"].is_deleted());
    }
}
