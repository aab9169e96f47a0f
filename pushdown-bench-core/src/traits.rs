use std::time::Duration;

use crate::aggregate::AggregationResult;
use crate::error::BenchError;

/// Number of timed phases per path. Both strategies decompose into exactly
/// two non-overlapping phases: load/compute for the local path, query/save
/// for the remote one.
pub const NUM_PHASES: usize = 2;

/// A benchmarkable strategy for obtaining a grouped aggregate.
///
/// Implementations time their own internal phase boundaries on a monotonic
/// clock and report the durations; the [`crate::Runner`] decides which
/// executions count as warmup and when the result is persisted.
pub trait MeasuredPath {
  /// Name used in reports and error messages.
  fn name(&self) -> &str;

  /// Labels for the two timed phases, e.g. `["load", "compute"]`.
  fn phase_labels(&self) -> [&'static str; NUM_PHASES];

  /// Cheap preconditions checked before any timing begins. Failures here
  /// abort the whole run as configuration errors.
  fn validate(&self) -> Result<(), BenchError> {
    Ok(())
  }

  /// Run the full strategy once. When `persist` is set the materialized
  /// [`AggregationResult`] is also written to the path's output file.
  fn execute(&mut self, persist: bool) -> Result<PathRun, BenchError>;
}

/// One complete execution of a path: its per-phase durations and the
/// materialized aggregate.
#[derive(Debug, Clone)]
pub struct PathRun {
  pub phase_durations: [Duration; NUM_PHASES],
  pub result: AggregationResult,
}
