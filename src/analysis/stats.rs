//! Descriptive statistics for numeric columns

use serde::Serialize;

/// Suggested transform for a skewed column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Log,
    Sqrt,
    Softplus,
    None,
}

impl Transform {
    pub fn suggest(skewness: Option<f64>) -> Self {
        match skewness {
            Some(s) if s > 3.0 => Transform::Log,
            Some(s) if s > 1.0 => Transform::Sqrt,
            Some(s) if s < -1.0 => Transform::Softplus,
            _ => Transform::None,
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transform::Log => "log",
            Transform::Sqrt => "sqrt",
            Transform::Softplus => "softplus",
            Transform::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values
    pub std: Option<f64>,
    pub sum: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub iqr: f64,
    /// Adjusted Fisher-Pearson coefficient; `None` below three values
    pub skewness: Option<f64>,
    pub transform: Transform,
}

/// Linear interpolation between closest ranks on sorted data
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
    if m2 == 0.0 {
        return Some(0.0);
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
}

/// Statistics of one column; `None` when it has no values
pub fn column_stats(column: &str, values: &[f64], missing: usize) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let mean = sum / n;
    let std = (values.len() > 1)
        .then(|| (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt());
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let skew = skewness(values);

    Some(ColumnStats {
        column: column.to_string(),
        count: values.len(),
        missing,
        mean,
        std,
        sum,
        min: sorted[0],
        q1,
        median: quantile(&sorted, 0.5),
        q3,
        max: sorted[sorted.len() - 1],
        iqr: q3 - q1,
        skewness: skew,
        transform: Transform::suggest(skew),
    })
}

/// Compact number for tables: scientific for very large or small magnitudes
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "-".to_string();
    }
    if value != 0.0 && (value.abs() >= 1e6 || value.abs() < 1e-3) {
        return format!("{:.3e}", value);
    }
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_match_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.75), 3.25);
    }

    #[test]
    fn test_column_stats() {
        let stats = column_stats("x", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 1).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.mean, 5.0);
        assert!((stats.std.unwrap() - 2.138089935).abs() < 1e-6);
        assert_eq!(stats.median, 4.5);
        assert_eq!(stats.sum, 40.0);
        assert!(column_stats("empty", &[], 3).is_none());
    }

    #[test]
    fn test_skewness_and_transform() {
        // pandas: pd.Series([1, 2, 3, 10]).skew() == 1.7710...
        let s = skewness(&[1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!((s - 1.771_040_6).abs() < 1e-5);
        assert_eq!(Transform::suggest(Some(s)), Transform::Sqrt);
        assert_eq!(Transform::suggest(Some(3.5)), Transform::Log);
        assert_eq!(Transform::suggest(Some(-1.5)), Transform::Softplus);
        assert_eq!(Transform::suggest(Some(0.2)), Transform::None);
        assert_eq!(skewness(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(skewness(&[1.0, 2.0]), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.5), "1234.5");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(12_345_678.0), "1.235e7");
        assert_eq!(format_number(f64::NAN), "-");
        assert_eq!(format_number(0.0), "0");
    }
}
