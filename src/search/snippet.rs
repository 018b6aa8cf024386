//! Context snippets around the first hit

const ELLIPSIS: char = '…';

/// Char offset of the first case-insensitive occurrence of any term
pub fn first_hit(content: &str, terms: &[String]) -> Option<(usize, usize)> {
    let lower: Vec<char> = content.chars().flat_map(char::to_lowercase).collect();
    // to_lowercase can change length for a few scripts; fall back to no hit
    if lower.len() != content.chars().count() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    for term in terms {
        let needle: Vec<char> = term.to_lowercase().chars().collect();
        if needle.is_empty() || needle.len() > lower.len() {
            continue;
        }
        if let Some(pos) = lower.windows(needle.len()).position(|w| w == needle.as_slice()) {
            if best.is_none_or(|(b, _)| pos < b) {
                best = Some((pos, needle.len()));
            }
        }
    }
    best
}

/// `context_chars` on each side of `(start, len)`, snapped to word boundaries
pub fn window(content: &str, hit: Option<(usize, usize)>, context_chars: usize) -> String {
    let chars: Vec<char> = content
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if chars.is_empty() {
        return String::new();
    }

    let (hit_start, hit_len) = hit.unwrap_or((0, 0));
    let mut start = hit_start.saturating_sub(context_chars);
    let mut end = (hit_start + hit_len + context_chars).min(chars.len());

    // Move inwards to the nearest space so words are not cut
    if start > 0 {
        if let Some(p) = chars[start..hit_start].iter().position(|c| *c == ' ') {
            start += p + 1;
        }
    }
    if end < chars.len() {
        if let Some(p) = chars[hit_start + hit_len..end].iter().rposition(|c| *c == ' ') {
            end = hit_start + hit_len + p;
        }
    }

    let body: String = chars[start..end].iter().collect();
    let body = body.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(body.len() + 6);
    if start > 0 {
        out.push(ELLIPSIS);
    }
    out.push_str(&body);
    if end < chars.len() {
        out.push(ELLIPSIS);
    }
    out
}

/// Snippet centred on the first occurrence of any term
pub fn make_snippet(content: &str, terms: &[String], context_chars: usize) -> String {
    window(content, first_hit(content, terms), context_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_hit_picks_earliest_term() {
        let terms = vec!["gamma".to_string(), "Beta".to_string()];
        assert_eq!(first_hit("alpha beta gamma", &terms), Some((6, 4)));
        assert_eq!(first_hit("nothing", &terms), None);
    }

    #[test]
    fn test_snippet_ellipses() {
        let content = "one two three four five six seven eight nine ten";
        let snippet = make_snippet(content, &["five".to_string()], 10);
        assert!(snippet.starts_with('…'));
        assert!(snippet.ends_with('…'));
        assert!(snippet.contains("five"));
        assert!(!snippet.contains("one"));
    }

    #[test]
    fn test_short_content_is_whole() {
        let snippet = make_snippet("short\nnote", &["note".to_string()], 150);
        assert_eq!(snippet, "short note");
    }

    #[test]
    fn test_no_hit_uses_start() {
        let snippet = make_snippet("abc def ghi jkl", &["zzz".to_string()], 7);
        assert_eq!(snippet, "abc…");
    }
}
