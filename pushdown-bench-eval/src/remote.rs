//! Remote-aggregation path: push the grouping and statistics down to a
//! ClickHouse server over its HTTP interface and retrieve only the reduced
//! result rows.
//!
//! The connection is a single long-lived handle acquired by the caller and
//! reused across every iteration; reconnecting per iteration would bias the
//! measurement. Failed requests are never retried — a failed iteration is a
//! failed measurement, not a retry candidate.

use std::path::PathBuf;
use std::time::Instant;

use pushdown_bench_core::aggregate::{AggregationResult, AggregationSpec, GroupStats, StatKind};
use pushdown_bench_core::error::BenchError;
use pushdown_bench_core::traits::{MeasuredPath, PathRun, NUM_PHASES};

use crate::sink;

/// Long-lived handle to one ClickHouse server, speaking the HTTP interface.
pub struct ClickHouseClient {
  http: reqwest::blocking::Client,
  url: String,
  user: String,
  password: String,
}

impl ClickHouseClient {
  /// Open a handle and verify the server is reachable and accepts the
  /// credentials. No retries: an unreachable or unauthenticated server
  /// fails immediately.
  pub fn connect(host: &str, port: u16, user: &str, password: &str) -> Result<Self, BenchError> {
    let client = Self {
      http: reqwest::blocking::Client::new(),
      url: format!("http://{host}:{port}/"),
      user: user.to_string(),
      password: password.to_string(),
    };
    match client.query_raw("SELECT 1") {
      Ok(pong) if pong.trim() == "1" => Ok(client),
      Ok(pong) => Err(BenchError::Connection(format!(
        "unexpected ping response from {}: {pong:?}",
        client.url
      ))),
      // The ping turns any engine-side rejection into a connection error:
      // the server is not usable as a measurement target.
      Err(BenchError::Query(message)) => Err(BenchError::Connection(message)),
      Err(other) => Err(other),
    }
  }

  /// Run one query and return the response body as tab-separated text. The
  /// body is fully read before returning, so the cost of retrieving the
  /// result set lands inside the caller's timing window.
  pub fn query_raw(&self, sql: &str) -> Result<String, BenchError> {
    let response = self
      .http
      .post(&self.url)
      .header("X-ClickHouse-User", &self.user)
      .header("X-ClickHouse-Key", &self.password)
      .body(sql.to_string())
      .send()
      .map_err(|e| BenchError::Connection(format!("request to {} failed: {e}", self.url)))?;

    let status = response.status();
    let body = response
      .text()
      .map_err(|e| BenchError::Connection(format!("failed to read response body: {e}")))?;
    if !status.is_success() {
      return Err(BenchError::Query(format!(
        "server returned {status}: {}",
        body.trim()
      )));
    }
    Ok(body)
  }
}

pub struct RemoteAggregationPath {
  name: String,
  client: ClickHouseClient,
  database: String,
  table: String,
  output: PathBuf,
  spec: AggregationSpec,
  sql: String,
}

impl RemoteAggregationPath {
  pub fn new(
    name: impl Into<String>,
    client: ClickHouseClient,
    database: impl Into<String>,
    table: impl Into<String>,
    output: PathBuf,
    spec: AggregationSpec,
  ) -> Self {
    let database = database.into();
    let table = table.into();
    let sql = aggregation_sql(&database, &table, &spec);
    Self {
      name: name.into(),
      client,
      database,
      table,
      output,
      spec,
      sql,
    }
  }
}

impl MeasuredPath for RemoteAggregationPath {
  fn name(&self) -> &str {
    &self.name
  }

  fn phase_labels(&self) -> [&'static str; NUM_PHASES] {
    ["query", "save"]
  }

  /// A missing table is a configuration error caught before any timing.
  fn validate(&self) -> Result<(), BenchError> {
    let exists = self
      .client
      .query_raw(&format!("EXISTS TABLE {}.{}", self.database, self.table))?;
    if exists.trim() != "1" {
      return Err(BenchError::InvalidConfiguration(format!(
        "table {}.{} does not exist",
        self.database, self.table
      )));
    }
    Ok(())
  }

  fn execute(&mut self, persist: bool) -> Result<PathRun, BenchError> {
    // Query covers request submission through full materialization of the
    // result rows on the client.
    let query_start = Instant::now();
    let body = self.client.query_raw(&self.sql)?;
    let result = parse_result(&body)?;
    let query = query_start.elapsed();

    // Save covers converting the rows into the output format; the file
    // itself is only written on the final measured iteration.
    let save_start = Instant::now();
    let batch = sink::result_batch(&self.spec, &result)?;
    if persist {
      sink::write_batch(&self.output, &batch)?;
    }
    let save = save_start.elapsed();

    Ok(PathRun {
      phase_durations: [query, save],
      result,
    })
  }
}

/// Build the pushdown query. `quantileExact` and `varSamp` keep the
/// engine-side semantics aligned with the local kernel: exact median and
/// sample (n - 1) variance.
fn aggregation_sql(database: &str, table: &str, spec: &AggregationSpec) -> String {
  let key = &spec.group_key;
  let value = &spec.value_column;
  let statistics: Vec<String> = spec
    .statistics
    .iter()
    .map(|stat| {
      let expression = match stat {
        StatKind::Mean => format!("avg({value})"),
        StatKind::Median => format!("quantileExact(0.5)({value})"),
        StatKind::Variance => format!("varSamp({value})"),
      };
      format!("{expression} AS {}_{value}", stat.column_prefix())
    })
    .collect();
  format!(
    "SELECT {key}, {} FROM {database}.{table} GROUP BY {key} ORDER BY {key} FORMAT TabSeparated",
    statistics.join(", ")
  )
}

/// Parse the engine's tab-separated rows: the group key, then mean, median
/// and variance in that order. `varSamp` reports `nan` for single-row
/// groups; that maps to an undefined variance.
fn parse_result(body: &str) -> Result<AggregationResult, BenchError> {
  const EXPECTED_FIELDS: usize = 4;
  let mut rows = Vec::new();
  for line in body.lines() {
    if line.is_empty() {
      continue;
    }
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != EXPECTED_FIELDS {
      return Err(BenchError::Query(format!(
        "expected {EXPECTED_FIELDS} columns per result row, got {}: {line:?}",
        fields.len()
      )));
    }
    let key = fields[0]
      .parse::<i64>()
      .map_err(|e| BenchError::Query(format!("bad group key {:?}: {e}", fields[0])))?;
    let variance = parse_float(fields[3])?;
    rows.push(GroupStats {
      key,
      mean: parse_float(fields[1])?,
      median: parse_float(fields[2])?,
      variance: if variance.is_nan() { None } else { Some(variance) },
    });
  }
  Ok(AggregationResult { rows })
}

fn parse_float(field: &str) -> Result<f64, BenchError> {
  field
    .parse::<f64>()
    .map_err(|e| BenchError::Query(format!("bad numeric field {field:?}: {e}")))
}
