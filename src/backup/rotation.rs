//! Keeping the newest N full backups

use super::archive::checksum_path;
use super::registry::{BackupKind, Registry};
use super::BackupDirs;
use crate::Result;
use std::collections::HashSet;
use std::path::Path;

/// Drop all but the newest `keep_full` full backups together with the
/// incrementals built on them. Returns the number of registry entries removed.
pub fn apply_rotation(backup_root: &Path, keep_full: usize) -> Result<usize> {
    let dirs = BackupDirs::ensure(backup_root)?;
    let mut registry = Registry::load(&dirs.registry)?;

    let fulls: Vec<&str> = registry
        .backups
        .iter()
        .filter(|b| b.kind == BackupKind::Full)
        .map(|b| b.archive.as_str())
        .collect();
    if fulls.len() <= keep_full.max(1) {
        return Ok(0);
    }

    // Registry order is chronological
    let pruned_fulls: HashSet<String> = fulls[..fulls.len() - keep_full.max(1)]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let (dropped, kept): (Vec<_>, Vec<_>) = registry.backups.drain(..).partition(|b| {
        pruned_fulls.contains(&b.archive)
            || b.chain.first().is_some_and(|s| pruned_fulls.contains(&s.archive))
    });
    registry.backups = kept;

    for entry in &dropped {
        let archive = Path::new(&entry.archive);
        std::fs::remove_file(archive).ok();
        std::fs::remove_file(checksum_path(archive)).ok();
        tracing::info!("Rotated out {}", entry.name());
    }
    registry.save(&dirs.registry)?;
    Ok(dropped.len())
}
