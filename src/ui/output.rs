use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::START, text.style(theme().header));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info),
        label.style(theme().dim),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.style(theme().header));
    println!("{}", "─".repeat(title.chars().count()).style(theme().dim));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim).to_string()
}

/// A path styled as a link-like target
pub fn path(text: &str) -> String {
    text.style(theme().path).to_string()
}

/// Highlight every case-insensitive occurrence of `terms` inside `text`
pub fn highlight(text: &str, terms: &[String]) -> String {
    let lower = text.to_lowercase();
    // Lowercasing may change byte lengths; fall back to plain text then
    if lower.len() != text.len() {
        return text.to_string();
    }

    let mut spans: Vec<(usize, usize)> = Vec::new();
    for term in terms.iter().filter(|t| !t.is_empty()) {
        let needle = term.to_lowercase();
        let mut from = 0;
        while let Some(pos) = lower[from..].find(&needle) {
            let start = from + pos;
            spans.push((start, start + needle.len()));
            from = start + needle.len();
        }
    }
    if spans.is_empty() {
        return text.to_string();
    }
    spans.sort();

    let mut out = String::with_capacity(text.len() + spans.len() * 8);
    let mut cursor = 0;
    for (start, end) in spans {
        if start < cursor || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str(&(&text[start..end]).style(theme().highlight).to_string());
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_without_terms_is_identity() {
        assert_eq!(highlight("quarterly report", &[]), "quarterly report");
        assert_eq!(highlight("quarterly report", &["missing".into()]), "quarterly report");
    }

    #[test]
    fn test_highlight_keeps_surrounding_text() {
        let out = highlight("Budget and BUDGET", &["budget".into()]);
        assert!(out.contains(" and "));
        assert_eq!(strip(&out), "Budget and BUDGET");
    }

    fn strip(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }
}
