//! Core harness for measuring grouped-aggregation latency.
//!
//! Two strategies for obtaining the same grouped aggregate (local in-memory
//! compute versus server-side pushdown) are wrapped as [`traits::MeasuredPath`]s
//! and driven through a warmup-then-measure protocol by [`Runner::run`]. The
//! harness records wall-clock durations per phase on a monotonic clock and
//! derives summary statistics over the measured iterations.
//!
//! This crate owns only the measurement protocol, the aggregation kernel and
//! the result types. File and network I/O live with the path implementations.

pub mod aggregate;
pub mod error;
pub mod summary;
pub mod traits;

use std::time::Duration;

use aggregate::AggregationResult;
use error::BenchError;
use summary::Summary;
use traits::{MeasuredPath, NUM_PHASES};

/// One measured duration, tagged with its phase label and the measured
/// iteration it came from. Warmup executions never produce samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
  pub phase: &'static str,
  pub iteration: usize,
  pub duration: Duration,
}

/// The ordered timing samples of one path across all measured iterations,
/// plus the aggregate materialized on the final iteration.
///
/// `result` is `None` when the run failed before the final iteration; the
/// samples collected up to that point are still present for diagnostics.
#[derive(Debug, Clone)]
pub struct RunResult {
  pub path_name: String,
  pub phase_labels: [&'static str; NUM_PHASES],
  pub samples: Vec<TimingSample>,
  pub result: Option<AggregationResult>,
}

impl RunResult {
  /// Durations recorded for one phase, in iteration order.
  pub fn phase_durations(&self, phase: &str) -> Vec<Duration> {
    self
      .samples
      .iter()
      .filter(|sample| sample.phase == phase)
      .map(|sample| sample.duration)
      .collect()
  }

  /// Number of measured iterations that completed.
  pub fn iterations(&self) -> usize {
    self
      .samples
      .iter()
      .map(|sample| sample.iteration + 1)
      .max()
      .unwrap_or(0)
  }

  /// Per-iteration totals: the sum of both phase durations of an iteration.
  pub fn totals(&self) -> Vec<Duration> {
    let mut totals = vec![Duration::ZERO; self.iterations()];
    for sample in &self.samples {
      totals[sample.iteration] += sample.duration;
    }
    totals
  }

  pub fn phase_summary(&self, phase: &str) -> Result<Summary, BenchError> {
    summary::summarize(&self.phase_durations(phase))
  }

  pub fn total_summary(&self) -> Result<Summary, BenchError> {
    summary::summarize(&self.totals())
  }
}

/// Iteration protocol for one path: `warmup` discarded executions followed
/// by `iterations` measured ones, strictly sequential on the current thread.
#[derive(Debug, Clone, Copy)]
pub struct Runner {
  pub warmup: usize,
  pub iterations: usize,
}

impl Runner {
  pub fn new(warmup: usize, iterations: usize) -> Self {
    Self { warmup, iterations }
  }

  /// Check the iteration protocol before any timing begins.
  pub fn validate(&self) -> Result<(), BenchError> {
    if self.iterations == 0 {
      return Err(BenchError::InvalidConfiguration(
        "iteration count must be at least 1".into(),
      ));
    }
    Ok(())
  }

  /// Drive a path through its warmup and measured iterations.
  ///
  /// Executions run strictly sequentially: running them concurrently would
  /// contend for the same CPU, disk and network and invalidate the timing
  /// comparison. The aggregate is persisted only on the last measured
  /// iteration so one-time output I/O stays out of the iteration-to-iteration
  /// variance, while the full pipeline (persistence included) is still
  /// exercised at least once.
  pub fn run(&self, path: &mut dyn MeasuredPath) -> Result<RunResult, BenchError> {
    self.validate()?;

    let phase_labels = path.phase_labels();
    let mut run = RunResult {
      path_name: path.name().to_string(),
      phase_labels,
      samples: Vec::with_capacity(self.iterations * NUM_PHASES),
      result: None,
    };

    // Warmup: full executions whose timings are discarded and whose output
    // is never written. Lets caches, connections and any deferred engine
    // work stabilize before measurement.
    for _ in 0..self.warmup {
      if let Err(source) = path.execute(false) {
        return Err(fail(run, source));
      }
    }

    for iteration in 0..self.iterations {
      let persist = iteration + 1 == self.iterations;
      match path.execute(persist) {
        Ok(one) => {
          for (label, duration) in phase_labels.into_iter().zip(one.phase_durations) {
            run.samples.push(TimingSample {
              phase: label,
              iteration,
              duration,
            });
          }
          if persist {
            run.result = Some(one.result);
          }
        }
        // A failed iteration fails the whole path. Dropping it and carrying
        // on would silently skew the summary statistics.
        Err(source) => return Err(fail(run, source)),
      }
    }

    Ok(run)
  }
}

fn fail(partial: RunResult, source: BenchError) -> BenchError {
  BenchError::MeasurementFailed {
    path: partial.path_name.clone(),
    partial: Box::new(partial),
    source: Box::new(source),
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use rstest::rstest;

  use crate::aggregate::aggregate;
  use crate::error::BenchError;
  use crate::traits::{MeasuredPath, PathRun, NUM_PHASES};
  use crate::Runner;

  /// Path double that returns fixed durations and records how it was driven.
  struct ScriptedPath {
    executions: usize,
    persisted: Vec<bool>,
    fail_at: Option<usize>,
  }

  impl ScriptedPath {
    fn new() -> Self {
      Self {
        executions: 0,
        persisted: Vec::new(),
        fail_at: None,
      }
    }
  }

  impl MeasuredPath for ScriptedPath {
    fn name(&self) -> &str {
      "scripted"
    }

    fn phase_labels(&self) -> [&'static str; NUM_PHASES] {
      ["load", "compute"]
    }

    fn execute(&mut self, persist: bool) -> Result<PathRun, BenchError> {
      if self.fail_at == Some(self.executions) {
        return Err(BenchError::Query("engine went away".into()));
      }
      self.executions += 1;
      self.persisted.push(persist);
      Ok(PathRun {
        phase_durations: [Duration::from_millis(10), Duration::from_millis(5)],
        result: aggregate([(1, 10.0), (1, 20.0)]),
      })
    }
  }

  #[rstest]
  #[case(0, 1)]
  #[case(1, 5)]
  #[case(3, 2)]
  fn exactly_iteration_count_samples_per_phase(#[case] warmup: usize, #[case] iterations: usize) {
    let mut path = ScriptedPath::new();
    let run = Runner::new(warmup, iterations).run(&mut path).unwrap();

    assert_eq!(path.executions, warmup + iterations);
    assert_eq!(run.samples.len(), iterations * NUM_PHASES);
    for phase in ["load", "compute"] {
      assert_eq!(run.phase_durations(phase).len(), iterations);
    }
  }

  #[test]
  fn zero_iterations_rejected_before_any_execution() {
    let mut path = ScriptedPath::new();
    let err = Runner::new(1, 0).run(&mut path).unwrap_err();
    assert!(matches!(err, BenchError::InvalidConfiguration(_)));
    assert_eq!(path.executions, 0);
  }

  #[test]
  fn persists_only_on_the_last_measured_iteration() {
    let mut path = ScriptedPath::new();
    let run = Runner::new(2, 3).run(&mut path).unwrap();
    assert_eq!(path.persisted, vec![false, false, false, false, true]);
    assert!(run.result.is_some());
  }

  #[test]
  fn totals_sum_both_phases_per_iteration() {
    let mut path = ScriptedPath::new();
    let run = Runner::new(0, 2).run(&mut path).unwrap();
    assert_eq!(
      run.totals(),
      vec![Duration::from_millis(15), Duration::from_millis(15)]
    );
  }

  #[test]
  fn failed_iteration_preserves_partial_samples() {
    let mut path = ScriptedPath::new();
    path.fail_at = Some(2);
    let err = Runner::new(0, 5).run(&mut path).unwrap_err();
    match err {
      BenchError::MeasurementFailed {
        path: name,
        partial,
        source,
      } => {
        assert_eq!(name, "scripted");
        assert_eq!(partial.samples.len(), 2 * NUM_PHASES);
        assert!(partial.result.is_none());
        assert!(matches!(*source, BenchError::Query(_)));
      }
      other => panic!("expected MeasurementFailed, got {other:?}"),
    }
  }

  #[test]
  fn warmup_failure_yields_empty_partial() {
    let mut path = ScriptedPath::new();
    path.fail_at = Some(0);
    let err = Runner::new(1, 3).run(&mut path).unwrap_err();
    match err {
      BenchError::MeasurementFailed { partial, .. } => {
        assert!(partial.samples.is_empty());
        assert_eq!(partial.iterations(), 0);
      }
      other => panic!("expected MeasurementFailed, got {other:?}"),
    }
  }

  #[test]
  fn phase_summary_reads_only_that_phase() {
    let mut path = ScriptedPath::new();
    let run = Runner::new(0, 3).run(&mut path).unwrap();
    let load = run.phase_summary("load").unwrap();
    let compute = run.phase_summary("compute").unwrap();
    assert_eq!(load.mean, Duration::from_millis(10));
    assert_eq!(compute.mean, Duration::from_millis(5));
  }
}
