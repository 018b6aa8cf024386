//! Plain text and source files, with front-matter metadata

use super::framework::{Extraction, Extractor};

const TEXT_EXTENSIONS: &[&str] = &[
    // Prose and notes
    "txt", "md", "markdown", "rst", "org", "adoc", "tex", "log",
    // Tabular and config
    "csv", "tsv", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "properties",
    // Source
    "rs", "py", "js", "ts", "jsx", "tsx", "java", "kt", "go", "c", "h", "cpp", "hpp", "cs",
    "rb", "php", "swift", "scala", "lua", "r", "sh", "bash", "zsh", "ps1", "bat", "sql",
    "css", "scss",
];

pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn format_name(&self) -> &str {
        "text"
    }

    fn file_extensions(&self) -> &[&str] {
        TEXT_EXTENSIONS
    }

    fn extract(&self, content: &str) -> Extraction {
        let front = front_matter(content);
        let field = |name: &str| {
            front
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        };

        Extraction {
            text: content.to_string(),
            title: field("title").or_else(|| first_heading(content)),
            author: field("author"),
            subject: field("subject").or_else(|| field("description")),
        }
    }
}

/// `key: value` pairs of a leading `---` block
fn front_matter(content: &str) -> Vec<(String, String)> {
    let mut lines = content.lines();
    if lines.next().map(str::trim) != Some("---") {
        return Vec::new();
    }

    let mut fields = Vec::new();
    for line in lines {
        let line = line.trim();
        if line == "---" || line == "..." {
            return fields;
        }
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim().trim_matches(['"', '\'']).trim();
            if !key.trim().is_empty() && !value.is_empty() {
                fields.push((key.trim().to_string(), value.to_string()));
            }
        }
    }
    // Unterminated block is not front matter
    Vec::new()
}

/// First Markdown ATX heading
fn first_heading(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let trimmed = line.trim_start();
        let rest = trimmed.trim_start_matches('#');
        let level = trimmed.len() - rest.len();
        if (1..=6).contains(&level) && rest.starts_with(' ') {
            let title = rest.trim().trim_end_matches('#').trim();
            (!title.is_empty()).then(|| title.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter_fields() {
        let doc = "---\ntitle: \"Quarterly Report\"\nauthor: Dana\n---\n# Heading\nBody";
        let ext = TextExtractor.extract(doc);
        assert_eq!(ext.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(ext.author.as_deref(), Some("Dana"));
        assert!(ext.text.contains("Body"));
    }

    #[test]
    fn test_heading_fallback() {
        let ext = TextExtractor.extract("intro\n## Meeting Notes ##\ntext");
        assert_eq!(ext.title.as_deref(), Some("Meeting Notes"));
        assert!(ext.author.is_none());
    }

    #[test]
    fn test_hashtag_is_not_heading() {
        let ext = TextExtractor.extract("#hashtag only");
        assert!(ext.title.is_none());
    }

    #[test]
    fn test_unterminated_front_matter_ignored() {
        let ext = TextExtractor.extract("---\ntitle: x\nno end");
        assert!(ext.title.is_none());
    }
}
