//! Delimiter detection and quote-aware CSV parsing

const CANDIDATES: [char; 4] = [',', ';', '\t', '|'];
const SAMPLE_LINES: usize = 20;

/// Occurrences of `delim` outside double quotes
fn count_outside_quotes(line: &str, delim: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delim && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Pick the delimiter that appears the same non-zero number of times on the
/// most sample lines. Falls back to the first candidate present, then `,`.
pub fn detect_delimiter(sample: &str) -> char {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();

    let mut best: Option<(char, usize, usize)> = None;
    for delim in CANDIDATES {
        let counts: Vec<usize> = lines.iter().map(|l| count_outside_quotes(l, delim)).collect();
        let Some(&first) = counts.first() else {
            continue;
        };
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == first).count();
        let better = match best {
            None => true,
            Some((_, best_consistent, best_fields)) => {
                consistent > best_consistent || (consistent == best_consistent && first > best_fields)
            }
        };
        if better {
            best = Some((delim, consistent, first));
        }
    }

    best.map(|(d, _, _)| d)
        .or_else(|| [';', ',', '\t', '|'].into_iter().find(|d| sample.contains(*d)))
        .unwrap_or(',')
}

/// Parse records, honouring quoted fields with embedded delimiters, doubled
/// quotes and newlines
pub fn parse(text: &str, delim: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            c if c == delim => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            c => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Numeric value of a cell: currency signs, thousands commas and `%` are ignored
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '%' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3\n4;5;6\n"), ';');
        assert_eq!(detect_delimiter("a\tb\n1\t2\n"), '\t');
        assert_eq!(detect_delimiter("name,note\n\"x\",\"a;b\"\n\"y\",\"c;d\"\n"), ',');
        assert_eq!(detect_delimiter("single\ncolumn\n"), ',');
    }

    #[test]
    fn test_parse_quotes() {
        let rows = parse("a,b\n\"x, y\",\"say \"\"hi\"\"\"\n\"multi\nline\",2\n", ',');
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["x, y", "say \"hi\""]);
        assert_eq!(rows[2][0], "multi\nline");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number("12%"), Some(12.0));
        assert_eq!(parse_number("€ 3"), Some(3.0));
        assert_eq!(parse_number("-0.5"), Some(-0.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
    }
}
