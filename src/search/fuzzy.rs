//! Fuzzy term expansion against the index vocabulary

/// Alternatives added per word
pub const MAX_EXPANSIONS: usize = 8;

/// Vocabulary terms considered per word (sharing its first letter)
pub const VOCAB_SCAN: usize = 5_000;

/// Normalized InDel similarity in `0.0..=100.0`: `200 * LCS / (|a| + |b|)`
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    // Single-row LCS table
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diag = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }

    200.0 * row[b.len()] as f64 / total as f64
}

/// Up to [`MAX_EXPANSIONS`] vocabulary terms scoring at least `threshold`,
/// best first. The word itself is never included.
pub fn expand(word: &str, vocabulary: &[String], threshold: u8) -> Vec<String> {
    let word = word.to_lowercase();
    let mut scored: Vec<(f64, &String)> = vocabulary
        .iter()
        .filter(|term| **term != word)
        .map(|term| (ratio(&word, term), term))
        .filter(|(score, _)| *score >= threshold as f64)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_EXPANSIONS)
        .map(|(_, term)| term.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("budget", "budget"), 100.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        // LCS("recieve", "receive") = 6
        let r = ratio("recieve", "receive");
        assert!((r - 200.0 * 6.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_expand_threshold_and_order() {
        let vocab: Vec<String> = ["receive", "recipe", "review", "banana", "recieve"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let expanded = expand("Recieve", &vocab, 80);
        assert_eq!(expanded, vec!["receive"]);

        let loose = expand("recieve", &vocab, 50);
        assert_eq!(loose[0], "receive");
        assert!(!loose.contains(&"banana".to_string()));
        assert!(!loose.contains(&"recieve".to_string()));
    }
}
