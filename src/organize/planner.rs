//! Organisation plan: where each file of a root should go

use crate::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Folder holding organizer logs
pub const LOG_DIR: &str = "log";
pub const DUPLICATES_DIR: &str = "Duplicates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Documents,
    Pictures,
    Videos,
    Audio,
    Archives,
    Code,
    Data,
    Others,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Documents,
        Category::Pictures,
        Category::Videos,
        Category::Audio,
        Category::Archives,
        Category::Code,
        Category::Data,
        Category::Others,
    ];

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" | "doc" | "docx" | "odt" | "rtf" | "txt" | "md" | "ppt" | "pptx" | "xls"
            | "xlsx" | "ods" | "odp" | "epub" | "tex" | "pages" => Category::Documents,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tif" | "tiff" | "webp" | "heic" | "svg"
            | "raw" | "cr2" | "nef" | "arw" | "dng" => Category::Pictures,
            "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" | "m4v" => Category::Videos,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "wma" | "opus" => Category::Audio,
            "zip" | "tar" | "gz" | "tgz" | "7z" | "rar" | "bz2" | "xz" => Category::Archives,
            "rs" | "py" | "js" | "ts" | "java" | "c" | "cpp" | "h" | "hpp" | "go" | "rb"
            | "php" | "sh" | "bat" | "ps1" | "html" | "css" | "kt" | "swift" => Category::Code,
            "csv" | "tsv" | "json" | "xml" | "yaml" | "yml" | "sql" | "db" | "sqlite"
            | "parquet" | "ndjson" => Category::Data,
            _ => Category::Others,
        }
    }

    pub fn folder(&self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Pictures => "Pictures",
            Category::Videos => "Videos",
            Category::Audio => "Audio",
            Category::Archives => "Archives",
            Category::Code => "Code",
            Category::Data => "Data",
            Category::Others => "Others",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.folder().eq_ignore_ascii_case(name.trim()))
    }
}

/// Second level of the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// `YYYY/MM` of the modification time
    #[default]
    Date,
    /// First letter or digit, uppercased; `#` otherwise
    Name,
    Extension,
}

impl std::str::FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "name" => Ok(SortBy::Name),
            "extension" | "ext" => Ok(SortBy::Extension),
            other => Err(Error::InvalidInput(format!(
                "unknown sort key '{}' (expected date, name or extension)",
                other
            ))),
        }
    }
}

/// One planned move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedFile {
    pub original_path: String,
    pub new_path: String,
    pub category: Category,
    pub extension: String,
    pub size: u64,
    /// `YYYY-MM-DD` of the modification time
    pub modified: String,
    pub hash: String,
    #[serde(default)]
    pub duplicate: bool,
    /// Destination already held identical content
    #[serde(default)]
    pub unchanged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_files: usize,
    pub documents: usize,
    pub pictures: usize,
    pub videos: usize,
    pub audio: usize,
    pub archives: usize,
    pub code: usize,
    pub data: usize,
    pub others: usize,
    pub duplicates: usize,
}

impl PlanSummary {
    fn count(&mut self, file: &PlannedFile) {
        self.total_files += 1;
        if file.duplicate {
            self.duplicates += 1;
            return;
        }
        let slot = match file.category {
            Category::Documents => &mut self.documents,
            Category::Pictures => &mut self.pictures,
            Category::Videos => &mut self.videos,
            Category::Audio => &mut self.audio,
            Category::Archives => &mut self.archives,
            Category::Code => &mut self.code,
            Category::Data => &mut self.data,
            Category::Others => &mut self.others,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub root: String,
    pub sort_by: SortBy,
    pub executed_by: String,
    pub executed_at: String,
}

/// A full plan; also the on-disk organizer log format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizePlan {
    pub meta: PlanMeta,
    pub files: Vec<PlannedFile>,
    pub summary: PlanSummary,
}

pub fn hash_file(path: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file = std::fs::File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn is_reserved_dir(name: &str) -> bool {
    name == LOG_DIR || name == DUPLICATES_DIR || Category::parse(name).is_some()
}

/// Files of `root`, skipping the log folder and already organised folders
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() == 1 && e.file_type().is_dir() && is_reserved_dir(&e.file_name().to_string_lossy()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn sort_key(path: &Path, ext: &str, modified: &DateTime<Local>, sort_by: SortBy) -> String {
    match sort_by {
        SortBy::Date => modified.format("%Y/%m").to_string(),
        SortBy::Name => path
            .file_name()
            .and_then(|n| n.to_string_lossy().chars().find(|c| c.is_alphanumeric()))
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "#".to_string()),
        SortBy::Extension if ext.is_empty() => "no_extension".to_string(),
        SortBy::Extension => ext.to_string(),
    }
}

/// `name (1).ext`, `name (2).ext`, ... until the path is free
pub fn free_path(candidate: PathBuf, claimed: &HashSet<PathBuf>) -> PathBuf {
    if !candidate.exists() && !claimed.contains(&candidate) {
        return candidate;
    }
    let parent = candidate.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = candidate.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 1;
    loop {
        let next = parent.join(format!("{} ({}){}", stem, n, ext));
        if !next.exists() && !claimed.contains(&next) {
            return next;
        }
        n += 1;
    }
}

/// Build the plan for `root` without touching any file
pub fn plan(root: &Path, sort_by: SortBy, executed_by: &str) -> Result<OrganizePlan> {
    if !root.is_dir() {
        return Err(Error::NotFound(root.display().to_string()));
    }

    let mut seen_hashes: HashMap<String, PathBuf> = HashMap::new();
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();
    let mut summary = PlanSummary::default();

    for path in collect_files(root) {
        let meta = std::fs::metadata(&path)?;
        let modified: DateTime<Local> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Local::now());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let category = Category::from_extension(&ext);
        let hash = hash_file(&path)?;
        let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();

        let duplicate = seen_hashes.contains_key(&hash);
        let destination = if duplicate {
            root.join(DUPLICATES_DIR).join(&file_name)
        } else {
            seen_hashes.insert(hash.clone(), path.clone());
            root.join(category.folder())
                .join(sort_key(&path, &ext, &modified, sort_by))
                .join(&file_name)
        };
        let destination = free_path(destination, &claimed);
        claimed.insert(destination.clone());

        let entry = PlannedFile {
            original_path: path.display().to_string(),
            new_path: destination.display().to_string(),
            category,
            extension: ext,
            size: meta.len(),
            modified: modified.format("%Y-%m-%d").to_string(),
            hash,
            duplicate,
            unchanged: false,
        };
        summary.count(&entry);
        files.push(entry);
    }

    Ok(OrganizePlan {
        meta: PlanMeta {
            root: root.display().to_string(),
            sort_by,
            executed_by: executed_by.to_string(),
            executed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        },
        files,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_categories() {
        assert_eq!(Category::from_extension("PDF"), Category::Documents);
        assert_eq!(Category::from_extension("jpeg"), Category::Pictures);
        assert_eq!(Category::from_extension("csv"), Category::Data);
        assert_eq!(Category::from_extension("xyz"), Category::Others);
        assert_eq!(Category::parse("videos"), Some(Category::Videos));
    }

    #[test]
    fn test_plan_by_name_with_duplicates() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("alpha.txt"), "same").unwrap();
        std::fs::write(root.join("beta.txt"), "same").unwrap();
        std::fs::write(root.join("_photo.png"), "png").unwrap();
        std::fs::create_dir_all(root.join("Documents")).unwrap();
        std::fs::write(root.join("Documents").join("done.txt"), "x").unwrap();
        std::fs::create_dir_all(root.join("log")).unwrap();
        std::fs::write(root.join("log").join("old.json"), "{}").unwrap();

        let plan = plan(root, SortBy::Name, "tester").unwrap();
        assert_eq!(plan.files.len(), 3);
        assert_eq!(plan.summary.duplicates, 1);
        assert_eq!(plan.summary.documents, 1);
        assert_eq!(plan.summary.pictures, 1);

        let photo = plan.files.iter().find(|f| f.original_path.ends_with("_photo.png")).unwrap();
        assert!(photo.new_path.ends_with("Pictures/P/_photo.png"));
        let alpha = plan.files.iter().find(|f| f.original_path.ends_with("alpha.txt")).unwrap();
        assert!(alpha.new_path.ends_with("Documents/A/alpha.txt"));
        let beta = plan.files.iter().find(|f| f.original_path.ends_with("beta.txt")).unwrap();
        assert!(beta.duplicate);
        assert!(beta.new_path.ends_with("Duplicates/beta.txt"));
    }

    #[test]
    fn test_plan_by_extension_and_date() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README"), "readme").unwrap();
        let by_ext = plan(dir.path(), SortBy::Extension, "t").unwrap();
        assert!(by_ext.files[0].new_path.ends_with("Others/no_extension/README"));

        let by_date = plan(dir.path(), SortBy::Date, "t").unwrap();
        let key = Local::now().format("%Y/%m").to_string();
        assert!(by_date.files[0].new_path.contains(&key));
    }

    #[test]
    fn test_free_path_avoids_claimed() {
        let mut claimed = HashSet::new();
        let first = free_path(PathBuf::from("/nowhere/x.txt"), &claimed);
        claimed.insert(first.clone());
        let second = free_path(PathBuf::from("/nowhere/x.txt"), &claimed);
        assert_eq!(second, PathBuf::from("/nowhere/x (1).txt"));
    }
}
