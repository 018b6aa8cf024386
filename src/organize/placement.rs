//! Profile placement rules: where a file belongs inside a scaffold

use super::executor::move_file;
use super::planner::Category;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "tiff", "bmp"];
const VIDEO_EXTS: &[&str] = &["mp4", "avi", "mov", "mkv"];

#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub source: String,
    pub destination: String,
    pub profile: String,
    pub rule: &'static str,
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn it_folder(ext: &str) -> &'static str {
    match ext {
        "py" | "bat" | "ps1" | "sh" => "IT/Code/Scripts",
        "cfg" | "ini" | "yaml" | "yml" | "json" | "toml" => "IT/Configs",
        "pdf" | "docx" => "IT/Docs/Manuals",
        "md" | "txt" => "IT/Docs/Notes",
        "log" => "IT/Logs",
        _ => "IT/Resources",
    }
}

fn health_folder(path: &Path, ext: &str) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains("patient") {
        "Health/Patients"
    } else if name.contains("report") {
        "Health/Reports"
    } else if name.contains("image") || matches!(ext, "jpg" | "png" | "dcm") {
        "Health/Imaging"
    } else if name.contains("lab") {
        "Health/Lab"
    } else {
        "Health/Archive"
    }
}

fn media_folder(ext: &str, shoot_name: Option<&str>) -> String {
    let day = chrono::Local::now().format("%Y-%m-%d").to_string();
    let shoot = match shoot_name {
        Some(name) => format!("{}-{}", day, name),
        None => day,
    };
    if IMAGE_EXTS.contains(&ext) {
        format!("Media/Shoots/{}/00_RAW", shoot)
    } else if VIDEO_EXTS.contains(&ext) {
        "Media/Video".to_string()
    } else {
        "Media/Archive".to_string()
    }
}

/// Destination folder (relative) and the rule that picked it
pub fn destination_folder(profile: &str, path: &Path, shoot_name: Option<&str>) -> (String, &'static str) {
    let ext = extension(path);
    match profile {
        "it" => (it_folder(&ext).to_string(), "it_rules"),
        "health" => (health_folder(path, &ext).to_string(), "health_rules"),
        "media" => (media_folder(&ext, shoot_name), "media_rules"),
        _ => (Category::from_extension(&ext).folder().to_string(), "category_rules"),
    }
}

/// Files matching each glob pattern; a plain path matches itself
pub fn expand_sources(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let entries = glob::glob(pattern)
            .map_err(|e| Error::InvalidInput(format!("bad pattern '{}': {}", pattern, e)))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable match: {}", e),
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Plan where each file goes under `destination_root`
pub fn build_plan(destination_root: &Path, files: &[PathBuf], profile: &str, shoot_name: Option<&str>) -> Vec<Placement> {
    let profile = profile.to_lowercase();
    files
        .iter()
        .filter(|p| p.is_file())
        .filter_map(|path| {
            let name = path.file_name()?;
            let (folder, rule) = destination_folder(&profile, path, shoot_name);
            Some(Placement {
                source: path.display().to_string(),
                destination: destination_root.join(folder).join(name).display().to_string(),
                profile: profile.clone(),
                rule,
            })
        })
        .collect()
}

/// Move files according to a plan; destinations that already exist are left alone
pub fn apply_plan(plan: &[Placement]) -> Result<usize> {
    let mut moved = 0;
    for placement in plan {
        let dst = Path::new(&placement.destination);
        if dst.exists() {
            tracing::warn!("Skipping {}: {} exists", placement.source, placement.destination);
            continue;
        }
        move_file(Path::new(&placement.source), dst)?;
        moved += 1;
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rules() {
        assert_eq!(destination_folder("it", Path::new("x/run.PS1"), None).0, "IT/Code/Scripts");
        assert_eq!(destination_folder("it", Path::new("x/blob.bin"), None).0, "IT/Resources");
        assert_eq!(destination_folder("health", Path::new("patient_42.pdf"), None).0, "Health/Patients");
        assert_eq!(destination_folder("health", Path::new("scan.dcm"), None).0, "Health/Imaging");
        assert_eq!(destination_folder("media", Path::new("clip.mov"), None).0, "Media/Video");
        let (raw, rule) = destination_folder("media", Path::new("a.jpg"), Some("beach"));
        assert!(raw.starts_with("Media/Shoots/") && raw.ends_with("-beach/00_RAW"));
        assert_eq!(rule, "media_rules");
        assert_eq!(destination_folder("data", Path::new("t.csv"), None).0, "Data");
    }

    #[test]
    fn test_plan_and_apply() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let file = src.path().join("lab_results.txt");
        std::fs::write(&file, "ok").unwrap();

        let plan = build_plan(dst.path(), &[file.clone(), src.path().join("missing.txt")], "health", None);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].rule, "health_rules");
        assert_eq!(apply_plan(&plan).unwrap(), 1);
        assert!(dst.path().join("Health/Lab/lab_results.txt").exists());
    }

    #[test]
    fn test_expand_sources() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("a.jpg"), "a").unwrap();
        std::fs::write(src.path().join("b.jpg"), "b").unwrap();
        std::fs::write(src.path().join("c.txt"), "c").unwrap();
        std::fs::create_dir(src.path().join("d.jpg")).unwrap();

        let pattern = format!("{}/*.jpg", src.path().display());
        let files = expand_sources(&[pattern.clone(), pattern]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(expand_sources(&["[".to_string()]).is_err());
    }
}
