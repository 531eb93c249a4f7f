//! Missing value analysis and descriptive statistics
//!
//! Everything here is read-only: the functions take a frame by reference and
//! return plain data for the report and the figures.

use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::columns::{float_values, has_column, is_numeric, missing_mask, string_values};
use super::error::PipelineResult;

/// Percentiles reported by [`numeric_summary`]
pub const SUMMARY_PERCENTILES: [f64; 5] = [0.05, 0.25, 0.50, 0.75, 0.95];

/// Label used for the missing bucket in categorical counts
pub const MISSING_BUCKET: &str = "<missing>";

/// Missing-value count for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEntry {
    pub column: String,
    pub count: usize,
    /// 100 × count / rows, rounded to 2 decimals
    pub percent: f64,
}

/// Descriptive statistics for a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1)
    pub std: Option<f64>,
    pub min: Option<f64>,
    /// Values at [`SUMMARY_PERCENTILES`], linearly interpolated
    pub percentiles: Vec<Option<f64>>,
    pub max: Option<f64>,
}

/// Ranked value counts for a non-numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub column: String,
    pub counts: Vec<(String, usize)>,
}

/// Mean outcome for one value of a grouping column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRate {
    pub group: String,
    pub rate: f64,
    pub count: usize,
}

/// Count missing values per column, sorted by percentage descending.
///
/// Ties keep the original column order.
pub fn missingness(df: &DataFrame) -> PipelineResult<Vec<MissingEntry>> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;
    let mut entries = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let count = missing_mask(col)?.into_iter().filter(|m| *m).count();
        entries.push(MissingEntry {
            column: col.name().to_string(),
            count,
            percent: round2(100.0 * count as f64 / rows),
        });
    }

    entries.sort_by(|a, b| {
        b.percent
            .partial_cmp(&a.percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(entries)
}

/// Descriptive statistics for every numeric column, in column order.
pub fn numeric_summary(df: &DataFrame) -> PipelineResult<Vec<NumericSummary>> {
    let numeric: Vec<&Column> = df.get_columns().iter().filter(|c| is_numeric(c)).collect();

    numeric
        .par_iter()
        .map(|col| -> PipelineResult<NumericSummary> {
            let values: Vec<f64> = float_values(col)?.into_iter().flatten().collect();
            Ok(summarize(col.name().as_str(), values))
        })
        .collect()
}

fn summarize(column: &str, mut values: Vec<f64>) -> NumericSummary {
    let count = values.len();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = if count > 0 {
        Some(values.iter().sum::<f64>() / count as f64)
    } else {
        None
    };

    let std = match mean {
        Some(m) if count > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
            Some((ss / (count - 1) as f64).sqrt())
        }
        _ => None,
    };

    NumericSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: values.first().copied(),
        percentiles: SUMMARY_PERCENTILES
            .iter()
            .map(|&q| percentile_sorted(&values, q))
            .collect(),
        max: values.last().copied(),
    }
}

/// Linear-interpolation percentile over sorted values.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Ranked value counts for every non-numeric column.
///
/// Missing values are counted under [`MISSING_BUCKET`]. Counts are sorted
/// descending, ties in first-seen order, and truncated to `top_n`.
pub fn categorical_summary(df: &DataFrame, top_n: usize) -> PipelineResult<Vec<CategoricalSummary>> {
    let mut summaries = Vec::new();

    for col in df.get_columns().iter().filter(|c| !is_numeric(c)) {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for value in string_values(col)? {
            let key = value.unwrap_or_else(|| MISSING_BUCKET.to_string());
            match index.get(&key) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(key.clone(), order.len());
                    order.push((key, 1));
                }
            }
        }

        // Stable sort keeps first-seen order among equal counts
        order.sort_by(|a, b| b.1.cmp(&a.1));
        order.truncate(top_n);

        summaries.push(CategoricalSummary {
            column: col.name().to_string(),
            counts: order,
        });
    }

    Ok(summaries)
}

/// Mean of `label` for each value of `group`.
///
/// Rows with a missing group or label are ignored. Numeric groups are sorted
/// numerically, text groups lexicographically. Returns `None` when either
/// column is absent.
pub fn survival_rate_by(
    df: &DataFrame,
    group: &str,
    label: &str,
) -> PipelineResult<Option<Vec<GroupRate>>> {
    if !has_column(df, group) || !has_column(df, label) {
        return Ok(None);
    }

    let labels = float_values(df.column(label)?)?;
    let group_col = df.column(group)?;

    let rates = if is_numeric(group_col) {
        let mut pairs: Vec<(f64, f64)> = float_values(group_col)?
            .into_iter()
            .zip(labels)
            .filter_map(|(g, y)| Some((g?, y?)))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut rates: Vec<GroupRate> = Vec::new();
        for chunk in pairs.chunk_by(|a, b| a.0 == b.0) {
            let sum: f64 = chunk.iter().map(|(_, y)| y).sum();
            rates.push(GroupRate {
                group: super::columns::format_number(chunk[0].0),
                rate: sum / chunk.len() as f64,
                count: chunk.len(),
            });
        }
        rates
    } else {
        let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for (g, y) in string_values(group_col)?.into_iter().zip(labels) {
            if let (Some(g), Some(y)) = (g, y) {
                let entry = groups.entry(g).or_insert((0.0, 0));
                entry.0 += y;
                entry.1 += 1;
            }
        }
        groups
            .into_iter()
            .map(|(group, (sum, count))| GroupRate {
                group,
                rate: sum / count as f64,
                count,
            })
            .collect()
    };

    Ok(Some(rates))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&sorted, 1.0), Some(4.0));
        assert!((percentile_sorted(&sorted, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_summarize_single_value_has_no_std() {
        let s = summarize("x", vec![5.0]);
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, Some(5.0));
        assert_eq!(s.std, None);
        assert_eq!(s.min, Some(5.0));
        assert_eq!(s.max, Some(5.0));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
    }

    #[test]
    fn test_survival_rate_by_text_group() {
        let df = df! {
            "sex" => ["male", "female", "female", "male"],
            "survived" => [0i32, 1, 1, 1],
        }
        .unwrap();

        let rates = survival_rate_by(&df, "sex", "survived").unwrap().unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].group, "female");
        assert_eq!(rates[0].rate, 1.0);
        assert_eq!(rates[1].group, "male");
        assert_eq!(rates[1].rate, 0.5);
    }

    #[test]
    fn test_survival_rate_by_numeric_group_sorted() {
        let df = df! {
            "pclass" => [3i64, 1, 2, 3, 1],
            "survived" => [0i32, 1, 0, 1, 1],
        }
        .unwrap();

        let rates = survival_rate_by(&df, "pclass", "survived").unwrap().unwrap();
        let groups: Vec<&str> = rates.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["1", "2", "3"]);
        assert_eq!(rates[2].rate, 0.5);
        assert_eq!(rates[0].count, 2);
    }

    #[test]
    fn test_survival_rate_absent_column() {
        let df = df! { "sex" => ["male"] }.unwrap();
        assert!(survival_rate_by(&df, "sex", "survived").unwrap().is_none());
    }
}
