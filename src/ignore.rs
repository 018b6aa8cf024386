use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

/// Project-local ignore file name
pub const IGNORE_FILE_NAME: &str = ".indexlyignore";

const MINIMAL: &[&str] = &[
    ".git/", ".hg/", ".svn/", ".indexly/",
    "*.db", "*.db-wal", "*.db-shm", "*.sqlite", "*.sqlite3",
];

const STANDARD: &[&str] = &[
    // Noise directories
    "node_modules/", "target/", "venv/", ".venv/", "__pycache__/", ".mypy_cache/",
    ".pytest_cache/", ".idea/", ".vscode/", "dist/", "build/", ".cache/",
    // Noise files
    "*.pyc", "*.pyo", "*.class", "*.o", "*.obj", "*.so", "*.dll", "*.exe", "*.dylib",
    "*.tmp", "*.swp", "*.bak", "~$*", ".DS_Store", "Thumbs.db", "*.lock",
];

const AGGRESSIVE: &[&str] = &[
    "log/", "logs/", "tmp/", "temp/", "coverage/", "vendor/", "out/",
    "*.log", "*.min.js", "*.map", "*.wasm", "*.iso", "*.img",
    "*.zip", "*.tar", "*.gz", "*.7z", "*.rar",
];

/// Built-in ignore presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Minimal,
    Standard,
    Aggressive,
}

impl Preset {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "minimal" => Some(Preset::Minimal),
            "standard" => Some(Preset::Standard),
            "aggressive" => Some(Preset::Aggressive),
            _ => None,
        }
    }

    /// Patterns for the preset; each level includes the previous ones
    pub fn patterns(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = MINIMAL.to_vec();
        if matches!(self, Preset::Standard | Preset::Aggressive) {
            out.extend_from_slice(STANDARD);
        }
        if matches!(self, Preset::Aggressive) {
            out.extend_from_slice(AGGRESSIVE);
        }
        out
    }

    /// Render the preset as an `.indexlyignore` template
    pub fn template(&self) -> String {
        let mut out = String::from("# Indexly ignore rules (gitignore syntax)\n");
        for pattern in self.patterns() {
            out.push_str(pattern);
            out.push('\n');
        }
        out
    }
}

pub struct IgnoreFilter {
    inner: Gitignore,
    source: Option<PathBuf>,
}

impl IgnoreFilter {
    /// Build the filter for `root`.
    ///
    /// Priority: explicit ignore file, then `<root>/.indexlyignore`, then the
    /// named preset. `extra_excludes` are always appended.
    pub fn new(
        root: &Path,
        ignore_file: Option<&Path>,
        preset: &str,
        extra_excludes: Option<&[String]>,
    ) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        let local = root.join(IGNORE_FILE_NAME);
        let source = match ignore_file {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            _ if local.exists() => Some(local),
            _ => None,
        };

        match &source {
            Some(path) => {
                if let Some(err) = builder.add(path) {
                    tracing::warn!("Partially invalid ignore file {}: {}", path.display(), err);
                }
                // Index databases are never content
                for pattern in MINIMAL {
                    builder.add_line(None, pattern).ok();
                }
            }
            None => {
                let preset = Preset::parse(preset).unwrap_or_else(|| {
                    tracing::warn!("Unknown ignore preset '{}', using standard", preset);
                    Preset::Standard
                });
                for pattern in preset.patterns() {
                    builder.add_line(None, pattern).ok();
                }
            }
        }

        if let Some(excludes) = extra_excludes {
            for pattern in excludes {
                builder.add_line(None, pattern).ok();
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
            source,
        }
    }

    /// Ignore file the rules were loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if !path.starts_with(self.inner.path()) {
            return self.inner.matched(path, is_dir).is_ignore();
        }
        self.inner.matched_path_or_any_parents(path, is_dir).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_preset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let filter = IgnoreFilter::new(root, None, "standard", None);

        assert!(filter.is_ignored(&root.join("node_modules/pkg/index.js"), false));
        assert!(filter.is_ignored(&root.join("fts_index.db"), false));
        assert!(filter.is_ignored(&root.join("module.pyc"), false));
        assert!(!filter.is_ignored(&root.join("notes/readme.md"), false));
        assert!(filter.source().is_none());
    }

    #[test]
    fn test_local_file_overrides_preset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(IGNORE_FILE_NAME), "# comment\nsecret/\n*.csv\n").unwrap();

        let filter = IgnoreFilter::new(root, None, "aggressive", None);
        assert!(filter.is_ignored(&root.join("secret/plan.txt"), false));
        assert!(filter.is_ignored(&root.join("data/table.csv"), false));
        // Preset rules no longer apply
        assert!(!filter.is_ignored(&root.join("server.log"), false));
        assert!(filter.is_ignored(&root.join("index.db"), false));
        assert!(filter.source().is_some());
    }

    #[test]
    fn test_extra_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let extra = vec!["drafts/".to_string()];
        let filter = IgnoreFilter::new(root, None, "minimal", Some(&extra));
        assert!(filter.is_ignored(&root.join("drafts/a.md"), false));
        assert!(!filter.is_ignored(&root.join("node_modules/a.js"), false));
    }

    #[test]
    fn test_template_levels() {
        assert!(Preset::Aggressive.template().contains("*.log"));
        assert!(!Preset::Minimal.template().contains("node_modules/"));
        assert_eq!(Preset::parse("STANDARD"), Some(Preset::Standard));
    }
}
