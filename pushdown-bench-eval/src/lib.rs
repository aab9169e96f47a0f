//! Measured paths and reporting for the grouped-aggregation benchmark.
//!
//! Two strategies for obtaining the same grouped aggregate are wrapped as
//! paths driven by the runner in `pushdown-bench-core`:
//! - [`local::LocalComputePath`] loads a CSV snapshot into Arrow record
//!   batches and aggregates in memory (phases: load, compute)
//! - [`remote::RemoteAggregationPath`] pushes the aggregation down to a
//!   ClickHouse server over its HTTP interface and retrieves only the
//!   reduced rows (phases: query, save)
//!
//! Both persist their result as a small CSV file through [`sink`], and
//! [`report`] prints the comparative summary.


pub mod local;
pub mod remote;
pub mod report;
pub mod sink;
