//! Per-format text extraction
//!
//! Each format provides an [`Extractor`] that turns decoded file content into
//! plain text plus a little metadata (title, author). Binary files and
//! unsupported extensions are skipped before any extractor runs.

pub mod framework;
pub mod json;
pub mod markup;
pub mod text;

pub use framework::{default_registry, extension_of, Extraction, Extractor, ExtractorRegistry};

use crate::Result;
use chrono::{DateTime, Local};
use std::path::Path;
use std::time::SystemTime;

/// Bytes inspected for a NUL when sniffing binary content
const BINARY_SNIFF_BYTES: usize = 8192;

/// Timestamp format stored in the index
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A file turned into indexable text
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub text: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub format: String,
    pub created: Option<String>,
    pub modified: String,
    pub size: u64,
}

/// Why a file produced no document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unsupported,
    Binary,
    TooLarge,
}

/// Read and extract a file.
///
/// Returns `Ok(Err(reason))` for files that are deliberately skipped.
pub fn extract_file(
    registry: &ExtractorRegistry,
    path: &Path,
    max_size: u64,
) -> Result<std::result::Result<ExtractedDocument, SkipReason>> {
    let Some(extractor) = registry.find(path) else {
        return Ok(Err(SkipReason::Unsupported));
    };

    let meta = std::fs::metadata(path)?;
    if meta.len() > max_size {
        return Ok(Err(SkipReason::TooLarge));
    }

    let bytes = std::fs::read(path)?;
    Ok(extract_bytes(extractor, path, &bytes, &meta))
}

/// Extract already loaded bytes (the indexer hashes the same buffer)
pub fn extract_bytes(
    extractor: &dyn Extractor,
    path: &Path,
    bytes: &[u8],
    meta: &std::fs::Metadata,
) -> std::result::Result<ExtractedDocument, SkipReason> {
    if is_binary(bytes) {
        return Err(SkipReason::Binary);
    }

    let content = String::from_utf8_lossy(bytes);
    let extraction = extractor.extract(&content);

    let mut text = extraction.text;
    if text.trim().is_empty() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        text = format!("File: {}", name);
    }

    Ok(ExtractedDocument {
        text,
        title: extraction.title,
        author: extraction.author,
        subject: extraction.subject,
        format: extension_of(path).unwrap_or_default(),
        created: meta.created().ok().map(format_time),
        modified: meta.modified().map(format_time).unwrap_or_default(),
        size: meta.len(),
    })
}

/// NUL byte in the first 8 KiB
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_BYTES).any(|b| *b == 0)
}

pub fn format_time(time: SystemTime) -> String {
    let dt: DateTime<Local> = time.into();
    dt.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_markdown_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Weekly Sync\nDiscussed hiring").unwrap();

        let registry = default_registry();
        let doc = extract_file(&registry, &path, 1024).unwrap().unwrap();
        assert_eq!(doc.title.as_deref(), Some("Weekly Sync"));
        assert_eq!(doc.format, "md");
        assert_eq!(doc.size, 30);
        assert_eq!(doc.modified.len(), 19);
    }

    #[test]
    fn test_skip_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry();

        let bin = dir.path().join("data.txt");
        std::fs::write(&bin, b"abc\0def").unwrap();
        assert_eq!(extract_file(&registry, &bin, 1024).unwrap(), Err(SkipReason::Binary));

        let big = dir.path().join("big.txt");
        std::fs::write(&big, "x".repeat(100)).unwrap();
        assert_eq!(extract_file(&registry, &big, 10).unwrap(), Err(SkipReason::TooLarge));

        let img = dir.path().join("photo.jpg");
        std::fs::write(&img, "jpg").unwrap();
        assert_eq!(extract_file(&registry, &img, 1024).unwrap(), Err(SkipReason::Unsupported));
    }

    #[test]
    fn test_empty_file_gets_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();

        let doc = extract_file(&default_registry(), &path, 1024).unwrap().unwrap();
        assert_eq!(doc.text, "File: empty.txt");
    }
}
