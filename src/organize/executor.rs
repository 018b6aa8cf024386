//! Carrying out an organisation plan

use super::planner::{self, OrganizePlan, SortBy, LOG_DIR};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub sort_by: SortBy,
    pub executed_by: String,
    /// Copy every moved file here as well, mirroring its new layout
    pub backup_root: Option<PathBuf>,
    /// Defaults to `<root>/log`
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteReport {
    pub plan: OrganizePlan,
    pub log_path: PathBuf,
    /// New path -> backup copy
    pub backups: BTreeMap<String, String>,
}

/// Move a file, copying then removing when a rename is not possible
pub fn move_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!("Rename {} failed ({}), copying", src.display(), rename_err);
            std::fs::copy(src, dst).map_err(|_| rename_err)?;
            std::fs::remove_file(src)
        }
    }
}

/// Write JSON through a temp file in the same folder
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let tmp = dir.join(format!(".tmp_{}", name));
    std::fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn log_file_name(root: &Path) -> String {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());
    format!("organized_{}_{}.json", chrono::Local::now().format("%Y-%m-%d"), root_name)
}

/// Plan and move every file of `root`, then write the organizer log
pub fn execute(root: &Path, options: &ExecuteOptions) -> Result<ExecuteReport> {
    let root = std::fs::canonicalize(root)?;
    let mut plan = planner::plan(&root, options.sort_by, &options.executed_by)?;
    tracing::info!("Organizing {} files under {}", plan.files.len(), root.display());

    let mut backups = BTreeMap::new();
    for file in &mut plan.files {
        let src = PathBuf::from(&file.original_path);
        let dst = PathBuf::from(&file.new_path);

        if dst.exists() && planner::hash_file(&dst)? == file.hash {
            file.unchanged = true;
            std::fs::remove_file(&src)?;
        } else {
            move_file(&src, &dst)?;
        }

        if let Some(backup_root) = &options.backup_root {
            if !file.unchanged {
                let relative = dst.strip_prefix(&root).unwrap_or(&dst);
                let copy = backup_root.join(relative);
                if let Some(parent) = copy.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&dst, &copy)?;
                backups.insert(file.new_path.clone(), copy.display().to_string());
            }
        }
    }

    let log_dir = options.log_dir.clone().unwrap_or_else(|| root.join(LOG_DIR));
    let log_path = log_dir.join(log_file_name(&root));
    write_json_atomic(&plan, &log_path)?;
    tracing::info!("Organizer log written to {}", log_path.display());

    Ok(ExecuteReport { plan, log_path, backups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_execute_moves_and_logs() {
        let dir = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("notes.md"), "notes").unwrap();
        std::fs::write(root.join("copy.md"), "notes").unwrap();
        std::fs::write(root.join("song.mp3"), "la").unwrap();

        let options = ExecuteOptions {
            sort_by: SortBy::Extension,
            executed_by: "tester".to_string(),
            backup_root: Some(backup.path().to_path_buf()),
            log_dir: None,
        };
        let report = execute(root, &options).unwrap();

        assert!(root.join("Audio/mp3/song.mp3").exists());
        assert!(!root.join("song.mp3").exists());
        // copy.md sorts first, so notes.md is the duplicate
        assert!(root.join("Documents/md/copy.md").exists());
        assert!(root.join("Duplicates/notes.md").exists());
        assert!(backup.path().join("Audio/mp3/song.mp3").exists());
        assert_eq!(report.backups.len(), 3);

        let text = std::fs::read_to_string(&report.log_path).unwrap();
        let logged: OrganizePlan = serde_json::from_str(&text).unwrap();
        assert_eq!(logged.summary.total_files, 3);
        assert_eq!(logged.summary.duplicates, 1);
        assert!(report.log_path.starts_with(root.canonicalize().unwrap().join("log")));

        // A second run finds nothing left to organize
        let again = execute(root, &options).unwrap();
        assert!(again.plan.files.is_empty());
    }

    #[test]
    fn test_move_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, "a").unwrap();
        let dst = dir.path().join("x/y/a.txt");
        move_file(&src, &dst).unwrap();
        assert!(dst.exists());
        assert!(!src.exists());
    }
}
