//! The comparative report over all benchmarked paths.
//!
//! Prints per-phase and total summary statistics for every path, marks
//! failed paths as incomplete, and reports the speedup ratio of each
//! complete candidate against the designated baseline. Incomplete paths are
//! excluded from speedup lines rather than compared against partial data.

use std::time::Duration;

use arrow::util::pretty::print_batches;

use pushdown_bench_core::aggregate::AggregationSpec;
use pushdown_bench_core::summary::{speedup_ratio, Summary};
use pushdown_bench_core::RunResult;

use crate::sink;

/// Outcome of one benchmarked path: a complete run, or the partial samples
/// preserved from a failed one.
pub struct PathOutcome {
  pub name: String,
  pub run: RunResult,
  pub failure: Option<String>,
}

impl PathOutcome {
  pub fn complete(run: RunResult) -> Self {
    Self {
      name: run.path_name.clone(),
      run,
      failure: None,
    }
  }

  pub fn failed(run: RunResult, reason: String) -> Self {
    Self {
      name: run.path_name.clone(),
      run,
      failure: Some(reason),
    }
  }

  pub fn is_complete(&self) -> bool {
    self.failure.is_none()
  }
}

/// Show the materialized aggregates, for eyeballing cross-path agreement.
pub fn print_results(outcomes: &[PathOutcome], spec: &AggregationSpec) {
  for outcome in outcomes {
    let Some(result) = &outcome.run.result else {
      continue;
    };
    println!("\nResult rows for {}:", outcome.name);
    match sink::result_batch(spec, result) {
      Ok(batch) => {
        if let Err(e) = print_batches(&[batch]) {
          println!("  (display failed: {e})");
        }
      }
      Err(e) => println!("  (unavailable: {e})"),
    }
  }
}

/// Print the full comparative report. `baseline` names the path every other
/// complete path is compared against.
pub fn print_report(outcomes: &[PathOutcome], baseline: &str) {
  println!("\n{}", "=".repeat(80));
  println!("  Grouped-aggregation latency report");
  println!("{}", "=".repeat(80));

  for outcome in outcomes {
    println!("\n  Path: {}", outcome.name);
    println!("  {}", "-".repeat(60));
    if let Some(reason) = &outcome.failure {
      println!(
        "  INCOMPLETE after {} measured iteration(s): {reason}",
        outcome.run.iterations()
      );
    }
    for phase in outcome.run.phase_labels {
      match outcome.run.phase_summary(phase) {
        Ok(summary) => print_summary_line(phase, &summary),
        Err(_) => println!("  {phase:<8} (no samples)"),
      }
    }
    match outcome.run.total_summary() {
      Ok(summary) => print_summary_line("total", &summary),
      Err(_) => println!("  total    (no samples)"),
    }
  }

  let baseline_mean = outcomes
    .iter()
    .find(|outcome| outcome.name == baseline && outcome.is_complete())
    .and_then(|outcome| outcome.run.total_summary().ok())
    .map(|summary| summary.mean);

  println!("\n  Speedup vs `{baseline}` (candidate mean total / baseline mean total):");
  for outcome in outcomes.iter().filter(|outcome| outcome.name != baseline) {
    if !outcome.is_complete() {
      println!("    {:<36} incomplete, excluded", outcome.name);
      continue;
    }
    let line = match (baseline_mean, outcome.run.total_summary()) {
      (Some(base), Ok(summary)) => match speedup_ratio(summary.mean, base) {
        Some(ratio) => format!("{ratio:.2}x"),
        None => "undefined (baseline mean is zero)".to_string(),
      },
      _ => "unavailable (baseline incomplete)".to_string(),
    };
    println!("    {:<36} {line}", outcome.name);
  }
  println!("{}", "=".repeat(80));
}

fn print_summary_line(label: &str, summary: &Summary) {
  println!(
    "  {label:<8} mean={:>9.2}ms  median={:>9.2}ms  min={:>9.2}ms  max={:>9.2}ms",
    ms(summary.mean),
    ms(summary.median),
    ms(summary.min),
    ms(summary.max)
  );
}

fn ms(duration: Duration) -> f64 {
  duration.as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use pushdown_bench_core::aggregate::aggregate;
  use pushdown_bench_core::traits::NUM_PHASES;
  use pushdown_bench_core::{RunResult, TimingSample};

  use super::*;

  fn run_with_samples(name: &str, millis: &[(u64, u64)]) -> RunResult {
    let mut samples = Vec::new();
    for (iteration, (load, compute)) in millis.iter().enumerate() {
      samples.push(TimingSample {
        phase: "load",
        iteration,
        duration: Duration::from_millis(*load),
      });
      samples.push(TimingSample {
        phase: "compute",
        iteration,
        duration: Duration::from_millis(*compute),
      });
    }
    RunResult {
      path_name: name.to_string(),
      phase_labels: ["load", "compute"],
      samples,
      result: Some(aggregate([(1, 10.0), (1, 20.0)])),
    }
  }

  #[test]
  fn incomplete_outcome_keeps_its_partial_samples() {
    let run = run_with_samples("broken", &[(10, 5)]);
    let outcome = PathOutcome::failed(run, "engine went away".into());
    assert!(!outcome.is_complete());
    assert_eq!(outcome.run.samples.len(), NUM_PHASES);
    // Printing must not panic on partial data.
    print_report(&[outcome], "baseline-that-is-absent");
  }

  #[test]
  fn report_handles_a_zero_duration_baseline_without_panicking() {
    let baseline = PathOutcome::complete(run_with_samples("baseline", &[(0, 0)]));
    let candidate = PathOutcome::complete(run_with_samples("candidate", &[(10, 5)]));
    print_report(&[candidate, baseline], "baseline");
  }
}
