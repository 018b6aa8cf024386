//! Token classification rules

use regex::Regex;
use std::sync::OnceLock;

/// How likely a human is to search for a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Plain words
    Human = 1,
    /// Dates, numbers, e-mails, URLs, codes
    Structured = 2,
    /// Hashes, UUIDs, encoded blobs
    Noise = 3,
}

const MAX_TOKEN_CHARS: usize = 40;
const TRIM_CHARS: &[char] = &[
    '"', '\'', '`', '(', ')', '[', ']', '{', '}', '<', '>', ',', ';', ':', '!', '?', '.', '*', '|',
];

struct Patterns {
    hex_run: Regex,
    uuid: Regex,
    base64: Regex,
    long_digits: Regex,
    date: Regex,
    time: Regex,
    email: Regex,
    url: Regex,
    key_value: Regex,
    number: Regex,
    version: Regex,
    code: Regex,
}

impl Patterns {
    fn build() -> Result<Self, regex::Error> {
        Ok(Self {
            hex_run: Regex::new(r"[0-9a-fA-F]{16,}")?,
            uuid: Regex::new(
                r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            )?,
            base64: Regex::new(r"^[A-Za-z0-9+/=_-]{24,}$")?,
            long_digits: Regex::new(r"\d{13,}")?,
            date: Regex::new(
                r"^(\d{4}[-/.]\d{1,2}[-/.]\d{1,2}(T[\d:.]+Z?)?|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}|\d{8})$",
            )?,
            time: Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?([aApP][mM])?$")?,
            email: Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")?,
            url: Regex::new(r"(?i)^((https?|ftp|file)://|www\.)\S+$")?,
            key_value: Regex::new(r"^[A-Za-z_][\w.-]*[:=]\S+$")?,
            number: Regex::new(r"^[-+]?[$€£¥]?[-+]?\d[\d,]*(\.\d+)?[%€$]?$")?,
            version: Regex::new(r"^[vV]?\d+(\.\d+){1,3}([-+][0-9A-Za-z.]+)?$")?,
            code: Regex::new(r"^[A-Za-z0-9]+([-_./#][A-Za-z0-9]+)*$")?,
        })
    }
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| match Patterns::build() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::error!("Invalid tier pattern: {}", e);
                None
            }
        })
        .as_ref()
}

/// Strip surrounding punctuation, keeping currency signs and percent
pub fn trim_token(raw: &str) -> &str {
    raw.trim_matches(TRIM_CHARS)
}

/// Classify an already trimmed token
pub fn classify(token: &str) -> Tier {
    if !token.chars().any(char::is_alphanumeric) {
        return Tier::Noise;
    }
    if token.chars().count() > MAX_TOKEN_CHARS {
        return Tier::Noise;
    }

    let Some(p) = patterns() else {
        return Tier::Human;
    };

    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let has_alpha = token.chars().any(char::is_alphabetic);

    if p.uuid.is_match(token) || p.long_digits.is_match(token) {
        return Tier::Noise;
    }
    if p.hex_run.is_match(token) {
        return Tier::Noise;
    }
    if has_digit && has_alpha && p.base64.is_match(token) {
        return Tier::Noise;
    }

    if p.date.is_match(token)
        || p.time.is_match(token)
        || p.email.is_match(token)
        || p.url.is_match(token)
        || p.number.is_match(token)
        || p.version.is_match(token)
        || p.key_value.is_match(token)
        || is_path(token)
        || (has_digit && has_alpha && p.code.is_match(token))
    {
        return Tier::Structured;
    }

    if has_digit {
        // Leftovers such as `x86_64` or `3d-model`
        return Tier::Structured;
    }

    Tier::Human
}

fn is_path(token: &str) -> bool {
    if token.starts_with("~/") || token.starts_with("./") || token.starts_with("../") {
        return true;
    }
    if token.len() > 2 && token.as_bytes()[1] == b':' && token[2..].starts_with('\\') {
        return true;
    }
    let separators = token.matches(['/', '\\']).count();
    separators >= 1
        && token
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .count()
            >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_words() {
        for word in ["invoice", "Report", "don't", "well-known", "Zürich"] {
            assert_eq!(classify(word), Tier::Human, "{}", word);
        }
    }

    #[test]
    fn test_structured_tokens() {
        for token in [
            "2024-05-01",
            "01.05.2024",
            "10:30",
            "alice@example.com",
            "https://example.com/a",
            "status:paid",
            "timeout=30",
            "1,250.00",
            "$99.95",
            "15%",
            "v1.2.3",
            "docs/reports/q1.md",
            "INV-2024-001",
        ] {
            assert_eq!(classify(token), Tier::Structured, "{}", token);
        }
    }

    #[test]
    fn test_noise_tokens() {
        for token in [
            "3f2a9c0d1e4b5a6f7c8d",
            "550e8400-e29b-41d4-a716-446655440000",
            "aGVsbG8gd29ybGQgdGhpcyBpcyBiYXNlNjQ0",
            "12345678901234",
            "---",
            "a_very_long_identifier_that_keeps_going_and_going",
        ] {
            assert_eq!(classify(token), Tier::Noise, "{}", token);
        }
    }

    #[test]
    fn test_letters_only_hex_run_is_noise() {
        assert_eq!(classify("deadbeefdeadbeefdeadbeef"), Tier::Noise);
        assert_eq!(classify("abcdefabcdefabcd"), Tier::Noise);
        // 15 hex letters stay below the run length
        assert_eq!(classify("acceded"), Tier::Human);
    }

    #[test]
    fn test_base64url_blob_is_noise() {
        for token in [
            "eyJhbGciOiJIUzI1NiIs-nR5cCI6IkpXVCJ9",
            "dGhpcy1pcy1hLXRlc3Q_dXJsLXNhZmU2NA",
        ] {
            assert_eq!(classify(token), Tier::Noise, "{}", token);
        }
        // Short dashed codes are still structured
        assert_eq!(classify("INV-2024-001"), Tier::Structured);
    }

    #[test]
    fn test_trim_token() {
        assert_eq!(trim_token("(hello),"), "hello");
        assert_eq!(trim_token("\"$12.50\"."), "$12.50");
        assert_eq!(trim_token("done."), "done");
    }
}
