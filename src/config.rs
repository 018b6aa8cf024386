use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "indexly.toml";

/// Default database file name inside the base directory
pub const DB_FILE_NAME: &str = "fts_index.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndexlyConfig {
    pub database: Option<PathBuf>,
    pub search: SearchSettings,
    pub cache: CacheSettings,
    pub log: LogSettings,
    pub index: IndexSettings,
    pub backup: BackupSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub limit: usize,
    pub context_chars: usize,
    pub fuzzy_threshold: u8,
    pub near_distance: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            limit: 20,
            context_chars: 150,
            fuzzy_threshold: 80,
            near_distance: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Seconds a cached result set stays fresh
    pub ttl_secs: u64,
    /// Upper bound of stale entries recomputed by one refresh run
    pub max_refresh_entries: usize,
    /// Entries kept after pruning
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            max_refresh_entries: 50,
            max_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogPartition {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub max_bytes: u64,
    pub retention_days: i64,
    pub partition: LogPartition,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            max_bytes: 5 * 1024 * 1024,
            retention_days: 30,
            partition: LogPartition::Daily,
            batch_size: 50,
            flush_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub max_file_size: u64,
    pub ignore_preset: String,
    pub excludes: Vec<String>,
    /// Worker threads; 0 means one per available core
    pub workers: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            ignore_preset: "standard".to_string(),
            excludes: Vec::new(),
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    pub root: Option<PathBuf>,
    pub keep_full: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            root: None,
            keep_full: 3,
        }
    }
}

impl IndexlyConfig {
    /// Database path, falling back to `<base>/fts_index.db`
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| base_dir().join(DB_FILE_NAME))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log.dir.clone().unwrap_or_else(|| base_dir().join("log"))
    }

    pub fn backup_root(&self) -> PathBuf {
        self.backup
            .root
            .clone()
            .unwrap_or_else(|| base_dir().join("backups"))
    }
}

/// Base directory for all Indexly state (`~/.indexly`)
pub fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".indexly")
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Load configuration: explicit path, then `./indexly.toml`, then
/// `~/.indexly/config.toml`. Missing files yield the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<IndexlyConfig> {
    let candidates = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("config file not found: {}", p.display());
            }
            vec![p.to_path_buf()]
        }
        None => vec![default_config_path(), base_dir().join("config.toml")],
    };

    for candidate in candidates {
        if candidate.exists() {
            let contents = std::fs::read_to_string(&candidate)?;
            let config: IndexlyConfig = toml::from_str(&contents)?;
            tracing::debug!("Loaded config from {}", candidate.display());
            return Ok(config);
        }
    }

    Ok(IndexlyConfig::default())
}

pub fn write_config(path: &Path, config: &IndexlyConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexlyConfig::default();
        assert_eq!(config.search.limit, 20);
        assert_eq!(config.search.fuzzy_threshold, 80);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.cache.max_refresh_entries, 50);
        assert_eq!(config.log.batch_size, 50);
        assert_eq!(config.backup.keep_full, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: IndexlyConfig = toml::from_str(
            r#"
            database = "/tmp/idx.db"

            [search]
            fuzzy_threshold = 70

            [log]
            partition = "hourly"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/idx.db"));
        assert_eq!(config.search.fuzzy_threshold, 70);
        assert_eq!(config.search.context_chars, 150);
        assert_eq!(config.log.partition, LogPartition::Hourly);
        assert_eq!(config.log.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        write_config(&path, &IndexlyConfig::default(), false).unwrap();
        assert!(write_config(&path, &IndexlyConfig::default(), false).is_err());
        assert!(write_config(&path, &IndexlyConfig::default(), true).is_ok());

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.search.limit, 20);
    }
}
