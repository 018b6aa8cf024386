use tabled::settings::{Alignment, Style, object::Columns};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct MetricRow<'a> {
    #[tabled(rename = "Metric")]
    metric: &'a str,
    #[tabled(rename = "Value")]
    value: &'a str,
}

/// Two-column metric/value table, values right-aligned
pub fn stats_table(stats: &[(&str, String)]) -> String {
    let rows: Vec<MetricRow> = stats
        .iter()
        .map(|(metric, value)| MetricRow { metric, value })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows)
        .with(Style::rounded())
        .modify(Columns::single(1), Alignment::right())
        .to_string()
}

/// Render any `Tabled` rows with the shared rounded style
pub fn render_rows<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(stats_table(&[]).is_empty());
        assert!(render_rows::<MetricRow>(&[]).is_empty());
    }

    #[test]
    fn test_stats_table_contains_rows() {
        let table = stats_table(&[("Files", "12".to_string()), ("Tags", "3".to_string())]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Files"));
        assert!(table.contains("12"));
    }
}
