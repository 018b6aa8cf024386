//! Automatic backup marker (`auto_enabled.json`)
//!
//! The marker only records intent; scheduling is left to the OS, which runs
//! `indexly backup <source>` periodically. Rotation is applied to backups of
//! the marked source.

use super::BackupDirs;
use crate::storage::normalize_path;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const AUTO_MARKER: &str = "auto_enabled.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoMarker {
    pub source: String,
    pub enabled: bool,
}

fn read_marker(backup_root: &Path) -> Option<AutoMarker> {
    let text = std::fs::read_to_string(backup_root.join(AUTO_MARKER)).ok()?;
    match serde_json::from_str(&text) {
        Ok(marker) => Some(marker),
        Err(e) => {
            tracing::warn!("Corrupted auto-backup marker: {}", e);
            None
        }
    }
}

pub fn is_enabled(backup_root: &Path, source: &Path) -> bool {
    read_marker(backup_root).is_some_and(|m| m.enabled && m.source == normalize_path(source))
}

/// Write the marker; returns false when automation was already enabled
pub fn init(backup_root: &Path, source: &Path) -> Result<bool> {
    if !source.is_dir() {
        return Err(Error::NotFound(source.display().to_string()));
    }
    let dirs = BackupDirs::ensure(backup_root)?;
    let path = dirs.root.join(AUTO_MARKER);
    if path.exists() {
        return Ok(false);
    }
    let marker = AutoMarker {
        source: normalize_path(source),
        enabled: true,
    };
    std::fs::write(&path, serde_json::to_string_pretty(&marker)?)?;
    tracing::info!("Automatic backup enabled for {}", marker.source);
    Ok(true)
}

/// Remove the marker. Requires `confirm`; a given `source` must match the marker.
pub fn disable(backup_root: &Path, source: Option<&Path>, confirm: bool) -> Result<()> {
    let path = backup_root.join(AUTO_MARKER);
    if !path.exists() {
        return Err(Error::NotFound("automatic backup is not enabled".to_string()));
    }
    if let Some(source) = source {
        let marker = read_marker(backup_root)
            .ok_or_else(|| Error::Backup("auto-backup marker is corrupted".to_string()))?;
        if marker.source != normalize_path(source) {
            return Err(Error::InvalidInput(format!(
                "automatic backup is not enabled for {}",
                source.display()
            )));
        }
    }
    if !confirm {
        return Err(Error::InvalidInput(
            "disabling automatic backup requires --confirm".to_string(),
        ));
    }
    std::fs::remove_file(&path)?;
    Ok(())
}
