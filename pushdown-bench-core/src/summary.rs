//! Summary statistics over timing samples, and the speedup ratio used by
//! the comparative report.

use std::time::Duration;

use crate::error::BenchError;

/// Mean, median, min and max over a non-empty set of durations. Derived on
/// demand from the recorded samples, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
  pub mean: Duration,
  pub median: Duration,
  pub min: Duration,
  pub max: Duration,
}

/// Summarize a set of durations.
///
/// An empty slice is an [`BenchError::InvalidConfiguration`]: it mirrors
/// the runner's requirement of at least one measured iteration.
pub fn summarize(durations: &[Duration]) -> Result<Summary, BenchError> {
  if durations.is_empty() {
    return Err(BenchError::InvalidConfiguration(
      "cannot summarize an empty set of timing samples".into(),
    ));
  }

  let mut sorted: Vec<f64> = durations.iter().map(Duration::as_secs_f64).collect();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

  let n = sorted.len();
  let mean = sorted.iter().sum::<f64>() / n as f64;
  let median = if n % 2 == 1 {
    sorted[n / 2]
  } else {
    (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
  };

  Ok(Summary {
    mean: Duration::from_secs_f64(mean),
    median: Duration::from_secs_f64(median),
    min: Duration::from_secs_f64(sorted[0]),
    max: Duration::from_secs_f64(sorted[n - 1]),
  })
}

/// Speedup ratio of a candidate path against the designated baseline:
/// candidate mean total divided by baseline mean total. Returns `None` when
/// the baseline mean is zero, where the ratio is undefined; callers must
/// flag it instead of dividing.
pub fn speedup_ratio(candidate_mean: Duration, baseline_mean: Duration) -> Option<f64> {
  let baseline = baseline_mean.as_secs_f64();
  if baseline == 0.0 {
    return None;
  }
  Some(candidate_mean.as_secs_f64() / baseline)
}
