//! Backups: SHA-256 manifests, `.tar.gz` archives, incremental chains
//!
//! Layout of the backup root:
//! - `full/`, `incremental/` archives plus `<archive>.sha256`
//! - `logs/` one text log per run
//! - `index.json` the registry
//! - `auto_enabled.json` the automation marker

pub mod archive;
pub mod auto;
pub mod executor;
pub mod manifest;
pub mod registry;
pub mod restore;
pub mod rotation;

pub use executor::{run_backup, BackupOutcome, BackupReport};
pub use registry::{BackupKind, Registry, RegistryEntry};
pub use restore::{restore_backup, RestoreReport};
pub use rotation::apply_rotation;

use crate::Result;
use std::path::{Path, PathBuf};

pub struct BackupDirs {
    pub root: PathBuf,
    pub full: PathBuf,
    pub incremental: PathBuf,
    pub logs: PathBuf,
    pub registry: PathBuf,
}

impl BackupDirs {
    pub fn ensure(root: &Path) -> Result<Self> {
        let dirs = Self {
            root: root.to_path_buf(),
            full: root.join("full"),
            incremental: root.join("incremental"),
            logs: root.join("logs"),
            registry: root.join("index.json"),
        };
        for dir in [&dirs.full, &dirs.incremental, &dirs.logs] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::TempDir;

    fn report(outcome: BackupOutcome) -> BackupReport {
        match outcome {
            BackupOutcome::Created(r) => r,
            BackupOutcome::Unchanged => panic!("expected a backup"),
        }
    }

    #[test]
    fn test_full_incremental_restore() {
        let source = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("docs")).unwrap();
        std::fs::write(source.path().join("docs/a.txt"), "alpha").unwrap();
        std::fs::write(source.path().join("b.txt"), "beta").unwrap();

        // No full backup yet: falls back to full
        let first = report(run_backup(root.path(), source.path(), true, 3).unwrap());
        assert_eq!(first.kind, BackupKind::Full);
        assert_eq!(first.copied, 2);

        assert!(matches!(
            run_backup(root.path(), source.path(), true, 3).unwrap(),
            BackupOutcome::Unchanged
        ));

        std::fs::write(source.path().join("docs/a.txt"), "alpha v2").unwrap();
        std::fs::remove_file(source.path().join("b.txt")).unwrap();
        std::fs::write(source.path().join("c.txt"), "gamma").unwrap();
        let second = report(run_backup(root.path(), source.path(), true, 3).unwrap());
        assert_eq!(second.kind, BackupKind::Incremental);
        assert_eq!(second.copied, 2);
        assert_eq!(second.deleted, 1);

        let registry = Registry::load(&root.path().join("index.json")).unwrap();
        assert_eq!(registry.backups.len(), 2);
        assert_eq!(registry.backups[1].chain.len(), 2);

        let name = second.archive.file_name().unwrap().to_string_lossy().to_string();
        let restored = restore_backup(root.path(), &name, target.path()).unwrap();
        assert_eq!(restored.steps, 2);
        assert_eq!(restored.removed, 1);
        assert_eq!(std::fs::read_to_string(target.path().join("docs/a.txt")).unwrap(), "alpha v2");
        assert_eq!(std::fs::read_to_string(target.path().join("c.txt")).unwrap(), "gamma");
        assert!(!target.path().join("b.txt").exists());
    }

    #[test]
    fn test_restore_detects_tampering() {
        let source = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        std::fs::write(source.path().join("a.txt"), "a").unwrap();
        let full = report(run_backup(root.path(), source.path(), false, 3).unwrap());
        std::fs::write(archive::checksum_path(&full.archive), "0000").unwrap();

        let name = full.archive.file_name().unwrap().to_string_lossy().to_string();
        let err = restore_backup(root.path(), &name, &root.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Backup(_)));
        assert!(matches!(
            restore_backup(root.path(), "missing.tar.gz", root.path()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_rotation_prunes_old_chains() {
        let source = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        std::fs::write(source.path().join("a.txt"), "0").unwrap();

        let oldest = report(run_backup(root.path(), source.path(), false, 1).unwrap());
        std::fs::write(source.path().join("a.txt"), "1").unwrap();
        let dependent = report(run_backup(root.path(), source.path(), true, 1).unwrap());
        std::fs::write(source.path().join("a.txt"), "2").unwrap();
        let newest = report(run_backup(root.path(), source.path(), false, 1).unwrap());

        let removed = apply_rotation(root.path(), 1).unwrap();
        assert_eq!(removed, 2);
        assert!(!oldest.archive.exists());
        assert!(!dependent.archive.exists());
        assert!(newest.archive.exists());
        let registry = Registry::load(&root.path().join("index.json")).unwrap();
        assert_eq!(registry.backups.len(), 1);
    }

    #[test]
    fn test_auto_marker() {
        let source = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        assert!(auto::init(root.path(), source.path()).unwrap());
        assert!(!auto::init(root.path(), source.path()).unwrap());
        assert!(auto::is_enabled(root.path(), source.path()));

        assert!(auto::disable(root.path(), Some(source.path()), false).is_err());
        assert!(auto::disable(root.path(), Some(root.path()), true).is_err());
        auto::disable(root.path(), Some(source.path()), true).unwrap();
        assert!(!auto::is_enabled(root.path(), source.path()));
    }
}
