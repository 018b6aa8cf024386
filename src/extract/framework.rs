//! Core extractor framework
//!
//! Defines the trait every per-format extractor implements and the registry
//! that picks one by file extension.

use std::path::Path;

/// Text and light metadata pulled out of one file
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl Extraction {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Trait for format extractors
pub trait Extractor: Send + Sync {
    /// Format name (for display)
    fn format_name(&self) -> &str;

    /// Lowercase extensions this extractor handles
    fn file_extensions(&self) -> &[&str];

    /// Check if this extractor can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        match extension_of(path) {
            Some(ext) => self.file_extensions().contains(&ext.as_str()),
            None => false,
        }
    }

    /// Turn decoded file content into indexable text
    fn extract(&self, content: &str) -> Extraction;
}

/// Lowercased extension of a path
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Registry of extractors
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extractor: impl Extractor + 'static) {
        self.extractors.push(Box::new(extractor));
    }

    /// Find an extractor for a file
    pub fn find(&self, path: &Path) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(path))
            .map(|e| e.as_ref())
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    /// All handled extensions, for help output
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self
            .extractors
            .iter()
            .flat_map(|e| e.file_extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts
    }
}

/// Create a registry with all built-in extractors
pub fn default_registry() -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register(super::markup::MarkupExtractor);
    registry.register(super::json::JsonExtractor);
    registry.register(super::text::TextExtractor);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestExtractor;

    impl Extractor for TestExtractor {
        fn format_name(&self) -> &str { "test" }
        fn file_extensions(&self) -> &[&str] { &["test"] }
        fn extract(&self, content: &str) -> Extraction {
            Extraction::from_text(content)
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = ExtractorRegistry::new();
        registry.register(TestExtractor);

        assert!(registry.find(Path::new("foo.test")).is_some());
        assert!(registry.find(Path::new("FOO.TEST")).is_some());
        assert!(registry.find(Path::new("foo.other")).is_none());
    }

    #[test]
    fn test_default_registry_dispatch() {
        let registry = default_registry();
        assert_eq!(registry.find(Path::new("a.html")).map(|e| e.format_name()), Some("markup"));
        assert_eq!(registry.find(Path::new("a.json")).map(|e| e.format_name()), Some("json"));
        assert_eq!(registry.find(Path::new("a.md")).map(|e| e.format_name()), Some("text"));
        assert!(!registry.is_supported(Path::new("photo.jpg")));
    }
}
