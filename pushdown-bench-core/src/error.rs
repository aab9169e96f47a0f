use thiserror::Error;

use crate::RunResult;

/// Errors produced by the harness and the measured paths.
#[derive(Debug, Error)]
pub enum BenchError {
  /// Configuration problems detected before any timing begins: zero
  /// iterations, a missing required column, an empty timing sample set.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// The remote engine is unreachable or rejected authentication.
  #[error("connection error: {0}")]
  Connection(String),

  /// The engine rejected or failed to execute an aggregation query, or
  /// returned rows the client cannot interpret.
  #[error("query error: {0}")]
  Query(String),

  /// The local source is missing required columns or is otherwise
  /// malformed.
  #[error("data format error: {0}")]
  DataFormat(String),

  /// Writing an output file failed.
  #[error("persistence error: {0}")]
  Persistence(String),

  /// An execution inside a run failed. The timing samples collected before
  /// the failure are preserved for diagnostics; they must never feed a
  /// speedup ratio.
  #[error("measurement failed for path `{path}`: {source}")]
  MeasurementFailed {
    path: String,
    partial: Box<RunResult>,
    source: Box<BenchError>,
  },
}
