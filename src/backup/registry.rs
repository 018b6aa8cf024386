//! The backup registry (`index.json`)

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Full,
    Incremental,
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupKind::Full => write!(f, "full"),
            BackupKind::Incremental => write!(f, "incremental"),
        }
    }
}

/// One archive to restore, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub archive: String,
    pub manifest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub source: String,
    pub archive: String,
    pub manifest: String,
    #[serde(default)]
    pub encrypted: bool,
    /// Full backup first, then every incremental up to and including this one
    pub chain: Vec<ChainStep>,
    pub registered_at: String,
}

impl RegistryEntry {
    /// File name of the archive, used to address backups on the command line
    pub fn name(&self) -> &str {
        Path::new(&self.archive)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.archive)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub backups: Vec<RegistryEntry>,
}

impl Registry {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn push(&mut self, entry: RegistryEntry) {
        self.backups.push(entry);
    }

    pub fn last_full(&self, source: &str) -> Option<&RegistryEntry> {
        self.backups
            .iter()
            .rev()
            .find(|b| b.kind == BackupKind::Full && b.source == source)
    }

    /// Newest backup of `source` whose chain starts at `full`
    pub fn last_in_chain(&self, source: &str, full: &RegistryEntry) -> Option<&RegistryEntry> {
        self.backups.iter().rev().find(|b| {
            b.source == source && b.chain.first().map(|s| s.archive.as_str()) == Some(full.archive.as_str())
        })
    }

    pub fn find(&self, name: &str) -> Option<&RegistryEntry> {
        self.backups.iter().find(|b| b.name() == name || b.archive == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(kind: BackupKind, archive: &str, chain: &[&str]) -> RegistryEntry {
        RegistryEntry {
            kind,
            source: "/src".to_string(),
            archive: archive.to_string(),
            manifest: "manifest.json".to_string(),
            encrypted: false,
            chain: chain
                .iter()
                .map(|a| ChainStep { archive: a.to_string(), manifest: "manifest.json".to_string() })
                .collect(),
            registered_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_lookup_and_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        let mut reg = Registry::load(&path).unwrap();
        assert!(reg.backups.is_empty());

        reg.push(entry(BackupKind::Full, "/b/full/full_1.tar.gz", &["/b/full/full_1.tar.gz"]));
        reg.push(entry(
            BackupKind::Incremental,
            "/b/incremental/incremental_2.tar.gz",
            &["/b/full/full_1.tar.gz", "/b/incremental/incremental_2.tar.gz"],
        ));
        reg.save(&path).unwrap();

        let reg = Registry::load(&path).unwrap();
        let full = reg.last_full("/src").unwrap();
        assert_eq!(full.name(), "full_1.tar.gz");
        assert_eq!(reg.last_in_chain("/src", full).unwrap().kind, BackupKind::Incremental);
        assert!(reg.find("incremental_2.tar.gz").is_some());
        assert!(reg.last_full("/other").is_none());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"type\": \"incremental\""));
    }
}
