//! Full and incremental backups

use super::archive::{self, DATA_DIR, MANIFEST_FILE, METADATA_FILE};
use super::manifest::{self, Manifest, ManifestEntry};
use super::registry::{BackupKind, ChainStep, Registry, RegistryEntry};
use super::{auto, rotation, BackupDirs};
use crate::storage::normalize_path;
use crate::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub kind: BackupKind,
    pub archive: PathBuf,
    pub checksum: String,
    pub copied: usize,
    pub deleted: usize,
    pub bytes: u64,
    /// Backups removed by rotation after this run
    pub rotated: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BackupOutcome {
    Created(BackupReport),
    /// Incremental run with nothing new since the previous backup
    Unchanged,
}

#[derive(Serialize)]
struct BackupMetadata<'a> {
    source: &'a str,
    kind: BackupKind,
    created_at: String,
    files: usize,
    total_bytes: u64,
    tool_version: &'static str,
}

/// Plain-text run log under `<root>/logs`
struct RunLog {
    file: Option<std::fs::File>,
}

impl RunLog {
    fn open(dirs: &BackupDirs, stamp: &str) -> Self {
        let path = dirs.logs.join(format!("backup_{}.log", stamp));
        let file = std::fs::OpenOptions::new().create(true).append(true).open(&path);
        if let Err(e) = &file {
            tracing::warn!("Cannot open backup log {}: {}", path.display(), e);
        }
        Self { file: file.ok() }
    }

    fn line(&mut self, message: &str) {
        tracing::debug!("{}", message);
        if let Some(file) = &mut self.file {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(file, "{} - {}", now, message).ok();
        }
    }
}

/// `<dir>/<kind>_<stamp>[_n]` that does not exist yet, with or without `.tar.gz`
fn unique_work_dir(dir: &Path, kind: BackupKind, stamp: &str) -> PathBuf {
    let mut n = 0;
    loop {
        let name = if n == 0 {
            format!("{}_{}", kind, stamp)
        } else {
            format!("{}_{}_{}", kind, stamp, n)
        };
        let work = dir.join(&name);
        if !work.exists() && !dir.join(format!("{}.tar.gz", name)).exists() {
            return work;
        }
        n += 1;
    }
}

/// Back up `source` into the backup root.
///
/// An incremental run without a usable full backup falls back to a full one.
pub fn run_backup(backup_root: &Path, source: &Path, incremental: bool, keep_full: usize) -> Result<BackupOutcome> {
    if !source.is_dir() {
        return Err(Error::NotFound(source.display().to_string()));
    }
    let dirs = BackupDirs::ensure(backup_root)?;
    let source_key = normalize_path(source);
    let mut registry = Registry::load(&dirs.registry)?;

    let base = if incremental {
        let base = registry.last_full(&source_key).and_then(|full| {
            registry
                .last_in_chain(&source_key, full)
                .filter(|b| Path::new(&b.archive).exists())
                .or(Some(full).filter(|f| Path::new(&f.archive).exists()))
        });
        if base.is_none() {
            tracing::warn!("No usable full backup of {}, creating a full backup", source_key);
        }
        base.cloned()
    } else {
        None
    };
    let kind = if base.is_some() { BackupKind::Incremental } else { BackupKind::Full };

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S").to_string();
    let mut log = RunLog::open(&dirs, &stamp);
    log.line(&format!("Starting {} backup of {}", kind, source_key));

    let previous: Manifest = match &base {
        Some(entry) => archive::read_manifest(Path::new(&entry.archive))?,
        None => Manifest::new(),
    };
    let current = manifest::build_manifest(source)?;
    let (changed, deleted) = manifest::diff_manifests(&previous, &current);

    if kind == BackupKind::Incremental && changed.is_empty() && deleted.is_empty() {
        log.line("No changes detected, skipping incremental backup");
        return Ok(BackupOutcome::Unchanged);
    }

    let kind_dir = match kind {
        BackupKind::Full => &dirs.full,
        BackupKind::Incremental => &dirs.incremental,
    };
    let work_dir = unique_work_dir(kind_dir, kind, &stamp);
    let result = build_archive(&work_dir, source, &source_key, kind, &previous, &changed, &deleted, &mut log);
    std::fs::remove_dir_all(&work_dir).ok();
    let (archive_path, bytes) = result?;

    let checksum = archive::write_checksum(&archive_path)?;
    log.line(&format!("Checksum {} written", checksum));

    let archive_str = archive_path.display().to_string();
    let mut chain = base.map(|b| b.chain).unwrap_or_default();
    chain.push(ChainStep {
        archive: archive_str.clone(),
        manifest: MANIFEST_FILE.to_string(),
    });
    registry.push(RegistryEntry {
        kind,
        source: source_key.clone(),
        archive: archive_str,
        manifest: MANIFEST_FILE.to_string(),
        encrypted: false,
        chain,
        registered_at: chrono::Utc::now().to_rfc3339(),
    });
    registry.save(&dirs.registry)?;

    let rotated = if auto::is_enabled(backup_root, source) {
        rotation::apply_rotation(backup_root, keep_full)?
    } else {
        0
    };

    log.line(&format!("Backup completed: {}", archive_path.display()));
    Ok(BackupOutcome::Created(BackupReport {
        kind,
        archive: archive_path,
        checksum,
        copied: changed.len(),
        deleted: deleted.len(),
        bytes,
        rotated,
    }))
}

#[allow(clippy::too_many_arguments)]
fn build_archive(
    work_dir: &Path,
    source: &Path,
    source_key: &str,
    kind: BackupKind,
    previous: &Manifest,
    changed: &Manifest,
    deleted: &[String],
    log: &mut RunLog,
) -> Result<(PathBuf, u64)> {
    let data_dir = work_dir.join(DATA_DIR);
    std::fs::create_dir_all(&data_dir)?;

    let mut bytes = 0;
    for (relative, entry) in changed {
        let dst = data_dir.join(relative);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source.join(relative), &dst)?;
        if let ManifestEntry::File { size, .. } = entry {
            bytes += size;
        }
        log.line(&format!("Copied {}", relative));
    }
    for relative in deleted {
        log.line(&format!("Deleted {}", relative));
    }

    let merged = manifest::merge(previous, changed, deleted);
    std::fs::write(work_dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&merged)?)?;
    let metadata = BackupMetadata {
        source: source_key,
        kind,
        created_at: chrono::Utc::now().to_rfc3339(),
        files: changed.len(),
        total_bytes: bytes,
        tool_version: env!("CARGO_PKG_VERSION"),
    };
    std::fs::write(work_dir.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;

    let mut archive_name = work_dir.as_os_str().to_os_string();
    archive_name.push(".tar.gz");
    let archive_path = PathBuf::from(archive_name);
    archive::create_tar_gz(work_dir, &archive_path)?;
    Ok((archive_path, bytes))
}
