//! Grouped aggregation: the statistic kinds, the result rows shared by both
//! measured paths, and the in-memory kernel used by the local-compute path.
//!
//! Both paths must produce numerically equivalent rows for the same dataset;
//! the kernel therefore pins down the semantics the remote query has to
//! match: exact median, and sample variance with denominator n - 1.

use std::collections::BTreeMap;

/// Statistics computed per group, in output-column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
  Mean,
  Median,
  Variance,
}

impl StatKind {
  /// Prefix used when naming the output column for a value column,
  /// e.g. `mean_fare_amount`.
  pub fn column_prefix(self) -> &'static str {
    match self {
      StatKind::Mean => "mean",
      StatKind::Median => "median",
      StatKind::Variance => "variance",
    }
  }
}

/// What to aggregate: one categorical group key, one numeric value column,
/// and the ordered statistics to compute. Fixed to mean/median/sample
/// variance in the current tooling, but carried as configuration so the
/// pushdown SQL and the output format stay derived from one place.
#[derive(Debug, Clone)]
pub struct AggregationSpec {
  pub group_key: String,
  pub value_column: String,
  pub statistics: Vec<StatKind>,
}

impl AggregationSpec {
  pub fn new(group_key: impl Into<String>, value_column: impl Into<String>) -> Self {
    Self {
      group_key: group_key.into(),
      value_column: value_column.into(),
      statistics: vec![StatKind::Mean, StatKind::Median, StatKind::Variance],
    }
  }

  /// Output column names: the group key followed by one column per
  /// statistic.
  pub fn output_columns(&self) -> Vec<String> {
    let mut columns = vec![self.group_key.clone()];
    columns.extend(
      self
        .statistics
        .iter()
        .map(|stat| format!("{}_{}", stat.column_prefix(), self.value_column)),
    );
    columns
  }
}

/// Aggregate statistics for one group-key value.
///
/// `variance` is the sample variance (denominator n - 1); it is `None` for
/// groups with fewer than two rows, where it is undefined. It must never be
/// coerced to a silent 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
  pub key: i64,
  pub mean: f64,
  pub median: f64,
  pub variance: Option<f64>,
}

/// Result rows in group-key ascending order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregationResult {
  pub rows: Vec<GroupStats>,
}

impl AggregationResult {
  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Row-for-row equality within `tolerance`. An undefined variance is
  /// equal only to another undefined variance.
  pub fn approx_eq(&self, other: &AggregationResult, tolerance: f64) -> bool {
    self.rows.len() == other.rows.len()
      && self.rows.iter().zip(&other.rows).all(|(a, b)| {
        a.key == b.key
          && (a.mean - b.mean).abs() <= tolerance
          && (a.median - b.median).abs() <= tolerance
          && match (a.variance, b.variance) {
            (Some(x), Some(y)) => (x - y).abs() <= tolerance,
            (None, None) => true,
            _ => false,
          }
      })
  }
}

/// Group `(key, value)` pairs by key and compute mean, median and sample
/// variance of each group's values, ascending by key.
pub fn aggregate(pairs: impl IntoIterator<Item = (i64, f64)>) -> AggregationResult {
  let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
  for (key, value) in pairs {
    groups.entry(key).or_default().push(value);
  }

  let rows = groups
    .into_iter()
    .map(|(key, mut values)| {
      let n = values.len() as f64;
      let mean = values.iter().sum::<f64>() / n;
      values.sort_by(|a, b| a.partial_cmp(b).unwrap());
      GroupStats {
        key,
        mean,
        median: median_of_sorted(&values),
        variance: sample_variance(&values, mean),
      }
    })
    .collect();

  AggregationResult { rows }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
  let n = sorted.len();
  if n % 2 == 1 {
    sorted[n / 2]
  } else {
    (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
  }
}

fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
  if values.len() < 2 {
    return None;
  }
  let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
  Some(sum_sq / (values.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
  use rstest::rstest;

  use super::*;

  #[test]
  fn taxi_scenario() {
    // Rows {(passenger_count=1, fare=10.0), (1, 20.0), (2, 15.0)}.
    let result = aggregate([(1, 10.0), (1, 20.0), (2, 15.0)]);
    assert_eq!(result.len(), 2);

    let first = result.rows[0];
    assert_eq!(first.key, 1);
    assert!((first.mean - 15.0).abs() < 1e-12);
    assert!((first.median - 15.0).abs() < 1e-12);
    assert!((first.variance.unwrap() - 50.0).abs() < 1e-12);

    let second = result.rows[1];
    assert_eq!(second.key, 2);
    assert!((second.mean - 15.0).abs() < 1e-12);
    assert_eq!(second.variance, None);
  }

  #[test]
  fn single_row_group_has_undefined_variance() {
    let result = aggregate([(7, 3.5)]);
    assert_eq!(result.rows[0].variance, None);
  }

  #[test]
  fn rows_are_ordered_by_key_ascending() {
    let result = aggregate([(3, 1.0), (1, 1.0), (2, 1.0), (1, 2.0)]);
    let keys: Vec<i64> = result.rows.iter().map(|row| row.key).collect();
    assert_eq!(keys, vec![1, 2, 3]);
  }

  #[rstest]
  #[case(vec![1.0, 2.0, 3.0], 2.0)]
  #[case(vec![1.0, 2.0, 3.0, 4.0], 2.5)]
  #[case(vec![5.0], 5.0)]
  fn median_handles_odd_and_even_counts(#[case] values: Vec<f64>, #[case] expected: f64) {
    let result = aggregate(values.into_iter().map(|v| (0, v)));
    assert!((result.rows[0].median - expected).abs() < 1e-12);
  }

  #[test]
  fn approx_eq_distinguishes_defined_and_undefined_variance() {
    let defined = aggregate([(1, 1.0), (1, 2.0)]);
    let undefined = aggregate([(1, 1.5)]);
    assert!(!defined.approx_eq(&undefined, 1.0));
    assert!(undefined.approx_eq(&undefined.clone(), 0.0));
  }

  #[test]
  fn output_columns_follow_the_statistic_order() {
    let spec = AggregationSpec::new("passenger_count", "fare_amount");
    assert_eq!(
      spec.output_columns(),
      vec![
        "passenger_count",
        "mean_fare_amount",
        "median_fare_amount",
        "variance_fare_amount",
      ]
    );
  }
}
