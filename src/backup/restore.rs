//! Restoring a backup chain

use super::archive::{self, DATA_DIR};
use super::registry::Registry;
use super::BackupDirs;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub backup: String,
    pub target: PathBuf,
    pub steps: usize,
    pub files: usize,
    pub removed: usize,
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    if !from.exists() {
        return Ok(0);
    }
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dst = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dst)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dst)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Restore the backup named `name` (archive file name) into `target`
pub fn restore_backup(backup_root: &Path, name: &str, target: &Path) -> Result<RestoreReport> {
    let dirs = BackupDirs::ensure(backup_root)?;
    let registry = Registry::load(&dirs.registry)?;
    let entry = registry
        .find(name)
        .ok_or_else(|| Error::NotFound(format!("backup '{}'", name)))?;
    if entry.chain.is_empty() {
        return Err(Error::Backup(format!("backup '{}' has no chain", name)));
    }

    let staging = tempfile_dir(&dirs.root)?;
    let merged = staging.join("merged");
    std::fs::create_dir_all(&merged)?;

    let result = (|| -> Result<RestoreReport> {
        let mut last_manifest = None;
        for (i, step) in entry.chain.iter().enumerate() {
            let archive_path = Path::new(&step.archive);
            archive::verify_checksum(archive_path)?;
            tracing::info!("Checksum verified for {}", archive_path.display());

            let unpacked = staging.join(format!("step_{}", i));
            archive::extract(archive_path, &unpacked)?;
            copy_tree(&unpacked.join(DATA_DIR), &merged)?;
            last_manifest = Some(archive::read_manifest(archive_path)?);
        }

        let mut removed = 0;
        for (relative, item) in last_manifest.iter().flatten() {
            let path = merged.join(relative);
            if item.is_deleted() && path.is_file() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        std::fs::create_dir_all(target)?;
        let files = copy_tree(&merged, target)?;
        Ok(RestoreReport {
            backup: entry.name().to_string(),
            target: target.to_path_buf(),
            steps: entry.chain.len(),
            files,
            removed,
        })
    })();

    std::fs::remove_dir_all(&staging).ok();
    result
}

fn tempfile_dir(root: &Path) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%f");
    let dir = root.join(format!(".restore_{}", stamp));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
