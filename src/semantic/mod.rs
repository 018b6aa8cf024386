//! Semantic tiering - decide which tokens are worth indexing
//!
//! Every whitespace separated token is sorted into one of three tiers:
//! - Tier 1: human words, indexed in `content` and `clean_content`
//! - Tier 2: structured values (dates, numbers, e-mails, codes), indexed in
//!   `content` and kept as metadata
//! - Tier 3: noise (hashes, UUIDs, encoded blobs), only counted and sampled

pub mod classify;

pub use classify::{classify, trim_token, Tier};

use serde::{Deserialize, Serialize};

const MAX_TIER2: usize = 200;
const MAX_TIER3_SAMPLE: usize = 20;

/// Result of running text through the tier filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieredText {
    /// Tier 1 + Tier 2, one output line per non-empty input line
    pub content: String,
    /// Tier 1 only
    pub clean_content: String,
    pub metadata: SemanticMetadata,
}

/// Tier 2 and Tier 3 details stored as `file_metadata.semantic_json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticMetadata {
    pub tier2: Vec<String>,
    pub tier3_count: usize,
    pub tier3_sample: Vec<String>,
}

impl TieredText {
    pub fn metadata_json(&self) -> String {
        serde_json::to_string(&self.metadata).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Splits text into tiers
#[derive(Debug, Clone)]
pub struct TierFilter {
    max_tier2: usize,
    max_tier3_sample: usize,
}

impl Default for TierFilter {
    fn default() -> Self {
        Self {
            max_tier2: MAX_TIER2,
            max_tier3_sample: MAX_TIER3_SAMPLE,
        }
    }
}

impl TierFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, text: &str) -> TieredText {
        let mut content_lines: Vec<String> = Vec::new();
        let mut clean_words: Vec<&str> = Vec::new();
        let mut meta = SemanticMetadata::default();

        for line in text.lines() {
            let mut kept: Vec<&str> = Vec::new();

            for raw in line.split_whitespace() {
                let token = trim_token(raw);
                if token.is_empty() {
                    continue;
                }
                match classify(token) {
                    Tier::Human => {
                        kept.push(token);
                        clean_words.push(token);
                    }
                    Tier::Structured => {
                        kept.push(token);
                        if meta.tier2.len() < self.max_tier2 && !meta.tier2.iter().any(|t| t == token) {
                            meta.tier2.push(token.to_string());
                        }
                    }
                    Tier::Noise => {
                        meta.tier3_count += 1;
                        if meta.tier3_sample.len() < self.max_tier3_sample
                            && !meta.tier3_sample.iter().any(|t| t == token)
                        {
                            meta.tier3_sample.push(token.to_string());
                        }
                    }
                }
            }

            if !kept.is_empty() {
                content_lines.push(kept.join(" "));
            }
        }

        TieredText {
            content: content_lines.join("\n"),
            clean_content: clean_words.join(" "),
            metadata: meta,
        }
    }
}
