//! File and folder comparison
//!
//! Exit codes follow `diff`: 0 identical, 1 differences found, 2 error.

use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use walkdir::WalkDir;

pub const EXIT_IDENTICAL: i32 = 0;
pub const EXIT_DIFFERENT: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

const TEXT_SNIFF: usize = 8192;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TextDiff {
    /// 1-based line number of the first difference
    pub first_difference: Option<usize>,
    pub lines_added: usize,
    pub lines_removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileComparison {
    pub left_hash: String,
    pub right_hash: String,
    pub identical: bool,
    pub text: Option<TextDiff>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderComparison {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: usize,
}

impl FolderComparison {
    pub fn identical(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Comparison {
    File(FileComparison),
    Folder(FolderComparison),
}

impl Comparison {
    pub fn identical(&self) -> bool {
        match self {
            Comparison::File(f) => f.identical,
            Comparison::Folder(f) => f.identical(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.identical() { EXIT_IDENTICAL } else { EXIT_DIFFERENT }
    }
}

pub fn compare(left: &Path, right: &Path) -> Result<Comparison> {
    for path in [left, right] {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
    }
    match (left.is_dir(), right.is_dir()) {
        (false, false) => compare_files(left, right).map(Comparison::File),
        (true, true) => compare_folders(left, right).map(Comparison::Folder),
        _ => Err(Error::InvalidInput(format!(
            "cannot compare a file with a folder: {} vs {}",
            left.display(),
            right.display()
        ))),
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(TEXT_SNIFF)];
    !head.contains(&0) && std::str::from_utf8(bytes).is_ok()
}

pub fn compare_files(left: &Path, right: &Path) -> Result<FileComparison> {
    let a = std::fs::read(left)?;
    let b = std::fs::read(right)?;
    let left_hash = blake3::hash(&a).to_hex().to_string();
    let right_hash = blake3::hash(&b).to_hex().to_string();
    let identical = left_hash == right_hash;

    let text = (!identical && looks_like_text(&a) && looks_like_text(&b))
        .then(|| diff_lines(&String::from_utf8_lossy(&a), &String::from_utf8_lossy(&b)));

    Ok(FileComparison {
        left_hash,
        right_hash,
        identical,
        text,
    })
}

/// Line-level summary: first differing position plus lines present on only
/// one side, counted as multisets
pub fn diff_lines(left: &str, right: &str) -> TextDiff {
    let a: Vec<&str> = left.lines().collect();
    let b: Vec<&str> = right.lines().collect();

    let first_difference = (0..a.len().max(b.len()))
        .find(|&i| a.get(i) != b.get(i))
        .map(|i| i + 1);

    let mut counts: HashMap<&str, isize> = HashMap::new();
    for line in &a {
        *counts.entry(line).or_default() += 1;
    }
    for line in &b {
        *counts.entry(line).or_default() -= 1;
    }
    let lines_removed = counts.values().filter(|&&c| c > 0).map(|&c| c as usize).sum();
    let lines_added = counts.values().filter(|&&c| c < 0).map(|&c| (-c) as usize).sum();

    TextDiff {
        first_difference,
        lines_added,
        lines_removed,
    }
}

/// Relative path -> BLAKE3 hash of every file under `root`
fn folder_manifest(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut manifest = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let bytes = std::fs::read(entry.path())?;
        manifest.insert(rel, blake3::hash(&bytes).to_hex().to_string());
    }
    Ok(manifest)
}

pub fn compare_folders(left: &Path, right: &Path) -> Result<FolderComparison> {
    let a = folder_manifest(left)?;
    let b = folder_manifest(right)?;
    let mut result = FolderComparison::default();

    for (path, hash) in &a {
        match b.get(path) {
            None => result.removed.push(path.clone()),
            Some(other) if other != hash => result.modified.push(path.clone()),
            Some(_) => result.unchanged += 1,
        }
    }
    result.added = b.keys().filter(|p| !a.contains_key(*p)).cloned().collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_identical_and_different_files() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");
        std::fs::write(&a, "one\ntwo\nthree\n").unwrap();
        std::fs::write(&b, "one\ntwo\nthree\n").unwrap();
        std::fs::write(&c, "one\nTWO\nthree\nfour\n").unwrap();

        let same = compare(&a, &b).unwrap();
        assert_eq!(same.exit_code(), EXIT_IDENTICAL);

        let diff = compare(&a, &c).unwrap();
        assert_eq!(diff.exit_code(), EXIT_DIFFERENT);
        let Comparison::File(file) = diff else { panic!("expected file comparison") };
        let text = file.text.unwrap();
        assert_eq!(text.first_difference, Some(2));
        assert_eq!(text.lines_removed, 1);
        assert_eq!(text.lines_added, 2);
    }

    #[test]
    fn test_binary_files_have_no_line_diff() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, [0u8, 1, 2]).unwrap();
        std::fs::write(&b, [0u8, 1, 3]).unwrap();
        let file = compare_files(&a, &b).unwrap();
        assert!(!file.identical);
        assert!(file.text.is_none());
    }

    #[test]
    fn test_folders() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        std::fs::create_dir_all(left.path().join("sub")).unwrap();
        std::fs::create_dir_all(right.path().join("sub")).unwrap();
        std::fs::write(left.path().join("same.txt"), "x").unwrap();
        std::fs::write(right.path().join("same.txt"), "x").unwrap();
        std::fs::write(left.path().join("sub/changed.txt"), "1").unwrap();
        std::fs::write(right.path().join("sub/changed.txt"), "2").unwrap();
        std::fs::write(left.path().join("gone.txt"), "g").unwrap();
        std::fs::write(right.path().join("new.txt"), "n").unwrap();

        let result = compare_folders(left.path(), right.path()).unwrap();
        assert_eq!(result.added, vec!["new.txt"]);
        assert_eq!(result.removed, vec!["gone.txt"]);
        assert_eq!(result.modified, vec!["sub/changed.txt"]);
        assert_eq!(result.unchanged, 1);
        assert!(!result.identical());
    }

    #[test]
    fn test_errors() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "f").unwrap();
        assert!(matches!(
            compare(&file, &dir.path().join("missing")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(compare(&file, dir.path()), Err(Error::InvalidInput(_))));
    }
}
