//! Local-compute path: load the CSV snapshot into Arrow record batches,
//! then aggregate in memory.
//!
//! The load phase covers everything needed to make the data queryable (file
//! read, CSV parsing, type coercion); the compute phase covers only the
//! grouping and statistics. Persistence of the final result sits outside
//! both timed phases.

use std::fs::File;
use std::io::Seek;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{AsArray, Float64Array, Int64Array};
use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Float64Type, Int64Type, Schema};

use pushdown_bench_core::aggregate::{aggregate, AggregationResult, AggregationSpec};
use pushdown_bench_core::error::BenchError;
use pushdown_bench_core::traits::{MeasuredPath, PathRun, NUM_PHASES};

use crate::sink;

/// Which columns the CSV reader materializes during the load phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSelection {
  /// Materialize every column in the file.
  All,
  /// Materialize only the group-key and value columns.
  KeyAndValue,
}

pub struct LocalComputePath {
  name: String,
  input: PathBuf,
  output: PathBuf,
  spec: AggregationSpec,
  selection: ColumnSelection,
}

impl LocalComputePath {
  pub fn new(
    name: impl Into<String>,
    input: PathBuf,
    output: PathBuf,
    spec: AggregationSpec,
    selection: ColumnSelection,
  ) -> Self {
    Self {
      name: name.into(),
      input,
      output,
      spec,
      selection,
    }
  }

  /// Open the input and infer its schema from the header row, resolving the
  /// indices of the group-key and value columns.
  fn open_and_infer(&self) -> Result<(File, Schema, usize, usize), BenchError> {
    let mut file = File::open(&self.input).map_err(|e| {
      BenchError::DataFormat(format!("cannot open {}: {e}", self.input.display()))
    })?;

    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None).map_err(|e| {
      BenchError::DataFormat(format!(
        "schema inference failed for {}: {e}",
        self.input.display()
      ))
    })?;
    file
      .rewind()
      .map_err(|e| BenchError::DataFormat(e.to_string()))?;

    let key_index = numeric_column_index(&schema, &self.spec.group_key)?;
    let value_index = numeric_column_index(&schema, &self.spec.value_column)?;
    Ok((file, schema, key_index, value_index))
  }

  /// Read the CSV into typed `(group key, value)` columns per batch.
  fn load(&self) -> Result<Vec<(Int64Array, Float64Array)>, BenchError> {
    let (file, schema, key_index, value_index) = self.open_and_infer()?;

    let mut builder = ReaderBuilder::new(Arc::new(schema))
      .with_format(Format::default().with_header(true))
      .with_batch_size(8192);
    if self.selection == ColumnSelection::KeyAndValue {
      builder = builder.with_projection(vec![key_index, value_index]);
    }
    let reader = builder.build(file).map_err(|e| {
      BenchError::DataFormat(format!("cannot read {}: {e}", self.input.display()))
    })?;

    // Projection reorders columns to the requested order.
    let (key_position, value_position) = match self.selection {
      ColumnSelection::KeyAndValue => (0, 1),
      ColumnSelection::All => (key_index, value_index),
    };

    let mut columns = Vec::new();
    for batch in reader {
      let batch = batch.map_err(|e| {
        BenchError::DataFormat(format!("csv read failed for {}: {e}", self.input.display()))
      })?;
      let keys = cast(batch.column(key_position), &DataType::Int64).map_err(|e| {
        BenchError::DataFormat(format!(
          "group-key column `{}` cannot be read as integers: {e}",
          self.spec.group_key
        ))
      })?;
      let values = cast(batch.column(value_position), &DataType::Float64).map_err(|e| {
        BenchError::DataFormat(format!(
          "value column `{}` cannot be read as floats: {e}",
          self.spec.value_column
        ))
      })?;
      columns.push((
        keys.as_primitive::<Int64Type>().clone(),
        values.as_primitive::<Float64Type>().clone(),
      ));
    }
    Ok(columns)
  }

  /// Group and aggregate the loaded columns. Rows with a null key or value
  /// are excluded, matching the engine-side aggregate functions which skip
  /// NULLs.
  fn compute(&self, columns: &[(Int64Array, Float64Array)]) -> AggregationResult {
    let pairs = columns.iter().flat_map(|(keys, values)| {
      keys
        .iter()
        .zip(values.iter())
        .filter_map(|(key, value)| Some((key?, value?)))
    });
    aggregate(pairs)
  }
}

impl MeasuredPath for LocalComputePath {
  fn name(&self) -> &str {
    &self.name
  }

  fn phase_labels(&self) -> [&'static str; NUM_PHASES] {
    ["load", "compute"]
  }

  /// Missing or non-numeric required columns are configuration errors when
  /// caught before measurement starts.
  fn validate(&self) -> Result<(), BenchError> {
    match self.open_and_infer() {
      Ok(_) => Ok(()),
      Err(BenchError::DataFormat(message)) => Err(BenchError::InvalidConfiguration(message)),
      Err(other) => Err(other),
    }
  }

  fn execute(&mut self, persist: bool) -> Result<PathRun, BenchError> {
    let load_start = Instant::now();
    let columns = self.load()?;
    let load = load_start.elapsed();

    let compute_start = Instant::now();
    let result = self.compute(&columns);
    let compute = compute_start.elapsed();

    if persist {
      sink::write_csv(&self.output, &self.spec, &result)?;
    }

    Ok(PathRun {
      phase_durations: [load, compute],
      result,
    })
  }
}

fn numeric_column_index(schema: &Schema, name: &str) -> Result<usize, BenchError> {
  let index = schema
    .index_of(name)
    .map_err(|_| BenchError::DataFormat(format!("column `{name}` not found in input")))?;
  let data_type = schema.field(index).data_type();
  if !data_type.is_numeric() {
    return Err(BenchError::DataFormat(format!(
      "column `{name}` is not numeric (inferred {data_type})"
    )));
  }
  Ok(index)
}
