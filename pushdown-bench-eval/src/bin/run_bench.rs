//! Benchmark entry point: measures the local-compute path (selective and
//! full column loads) against ClickHouse-side aggregation and prints a
//! comparative report.
//!
//! The paths run strictly one after another on a single thread; running
//! them concurrently would share CPU, disk and network and invalidate the
//! comparison. The exit status is non-zero when any benchmarked path fails.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use pushdown_bench_core::aggregate::AggregationSpec;
use pushdown_bench_core::error::BenchError;
use pushdown_bench_core::traits::MeasuredPath;
use pushdown_bench_core::Runner;
use pushdown_bench_eval::local::{ColumnSelection, LocalComputePath};
use pushdown_bench_eval::remote::{ClickHouseClient, RemoteAggregationPath};
use pushdown_bench_eval::report::{self, PathOutcome};

const REMOTE_PATH_NAME: &str = "clickhouse (pushdown)";

/// Compare local in-memory aggregation against ClickHouse-side aggregation.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
  #[clap(long, default_value = "localhost", help = "ClickHouse host")]
  host: String,
  #[clap(long, default_value_t = 8123, help = "ClickHouse HTTP port")]
  port: u16,
  #[clap(long, default_value = "default", help = "ClickHouse user")]
  user: String,
  #[clap(long, default_value = "", help = "ClickHouse password")]
  password: String,
  #[clap(long, default_value = "nyc_taxi", help = "Database name")]
  database: String,
  #[clap(long, default_value = "trips_small", help = "Table name")]
  table: String,
  #[clap(long, default_value = "passenger_count", help = "Group-key column")]
  group_key: String,
  #[clap(long, default_value = "fare_amount", help = "Numeric value column")]
  value_column: String,
  #[clap(
    long,
    default_value = "data/nyc_taxi_data.csv",
    help = "Input CSV snapshot for the local paths"
  )]
  csv_input: PathBuf,
  #[clap(
    long,
    default_value = "results_local.csv",
    help = "Output file for the selective-column local path"
  )]
  output_local: PathBuf,
  #[clap(
    long,
    default_value = "results_local_full.csv",
    help = "Output file for the full-load local path"
  )]
  output_local_full: PathBuf,
  #[clap(
    long,
    default_value = "results_remote.csv",
    help = "Output file for the remote path"
  )]
  output_remote: PathBuf,
  #[clap(long, short = 'i', default_value_t = 5, help = "Measured iterations per path")]
  iterations: usize,
  #[clap(long, short = 'w', default_value_t = 1, help = "Warmup iterations per path")]
  warmup: usize,
}

fn main() -> Result<()> {
  env_logger::init();
  let args = Args::parse();

  let spec = AggregationSpec::new(&args.group_key, &args.value_column);
  let runner = Runner::new(args.warmup, args.iterations);
  runner.validate()?;

  info!("connecting to ClickHouse at {}:{}", args.host, args.port);
  let client = ClickHouseClient::connect(&args.host, args.port, &args.user, &args.password)?;

  let mut paths: Vec<Box<dyn MeasuredPath>> = vec![
    Box::new(LocalComputePath::new(
      "local (key+value columns)",
      args.csv_input.clone(),
      args.output_local.clone(),
      spec.clone(),
      ColumnSelection::KeyAndValue,
    )),
    Box::new(LocalComputePath::new(
      "local (all columns)",
      args.csv_input.clone(),
      args.output_local_full.clone(),
      spec.clone(),
      ColumnSelection::All,
    )),
    Box::new(RemoteAggregationPath::new(
      REMOTE_PATH_NAME,
      client,
      &args.database,
      &args.table,
      args.output_remote.clone(),
      spec.clone(),
    )),
  ];

  // Configuration problems abort the whole run before any timing begins.
  for path in paths.iter() {
    path.validate()?;
  }

  let mut outcomes = Vec::new();
  for path in paths.iter_mut() {
    info!(
      "benchmarking `{}` ({} warmup, {} measured iterations)",
      path.name(),
      args.warmup,
      args.iterations
    );
    match runner.run(path.as_mut()) {
      Ok(run) => outcomes.push(PathOutcome::complete(run)),
      Err(BenchError::MeasurementFailed {
        partial, source, ..
      }) => {
        // Keep the partial samples for the report; the path is marked
        // incomplete and excluded from speedup calculations.
        outcomes.push(PathOutcome::failed(*partial, source.to_string()));
      }
      Err(other) => return Err(other.into()),
    }
  }

  report::print_results(&outcomes, &spec);
  report::print_report(&outcomes, REMOTE_PATH_NAME);

  let failed = outcomes.iter().filter(|o| !o.is_complete()).count();
  if failed > 0 {
    anyhow::bail!("{failed} of {} benchmarked paths failed", outcomes.len());
  }
  Ok(())
}
