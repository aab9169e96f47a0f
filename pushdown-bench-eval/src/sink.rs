//! Persisting an aggregation result as a delimited output file.
//!
//! The output schema is `<group_key>,mean_<value>,median_<value>,
//! variance_<value>` with a header row, one row per group in ascending key
//! order. An undefined variance becomes a null in the Arrow batch and an
//! empty field in the file.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};

use pushdown_bench_core::aggregate::{AggregationResult, AggregationSpec};
use pushdown_bench_core::error::BenchError;

/// Materialize the result rows as a record batch with the configured output
/// column names.
pub fn result_batch(
  spec: &AggregationSpec,
  result: &AggregationResult,
) -> Result<RecordBatch, BenchError> {
  let names = spec.output_columns();
  let fields: Vec<Field> = names
    .iter()
    .enumerate()
    .map(|(i, name)| {
      if i == 0 {
        Field::new(name, DataType::Int64, false)
      } else {
        Field::new(name, DataType::Float64, true)
      }
    })
    .collect();

  let keys = Int64Array::from(result.rows.iter().map(|row| row.key).collect::<Vec<_>>());
  let means = Float64Array::from(result.rows.iter().map(|row| row.mean).collect::<Vec<_>>());
  let medians = Float64Array::from(result.rows.iter().map(|row| row.median).collect::<Vec<_>>());
  let variances =
    Float64Array::from(result.rows.iter().map(|row| row.variance).collect::<Vec<_>>());

  let arrays: Vec<ArrayRef> = vec![
    Arc::new(keys),
    Arc::new(means),
    Arc::new(medians),
    Arc::new(variances),
  ];
  RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
    .map_err(|e| BenchError::Persistence(format!("failed to build output batch: {e}")))
}

/// Write the batch to `path` with a header row.
pub fn write_batch(path: &Path, batch: &RecordBatch) -> Result<(), BenchError> {
  let file = File::create(path)
    .map_err(|e| BenchError::Persistence(format!("cannot create {}: {e}", path.display())))?;
  let mut writer = WriterBuilder::new().with_header(true).build(file);
  writer
    .write(batch)
    .map_err(|e| BenchError::Persistence(format!("cannot write {}: {e}", path.display())))
}

/// Convert and write in one step. Used by the local path, where persistence
/// sits outside the timed phases.
pub fn write_csv(
  path: &Path,
  spec: &AggregationSpec,
  result: &AggregationResult,
) -> Result<(), BenchError> {
  write_batch(path, &result_batch(spec, result)?)
}
