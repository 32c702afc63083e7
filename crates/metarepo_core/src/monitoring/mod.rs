//! Request correlation and query metrics.
//!
//! # Responsibility
//! - Carry correlation identifiers for one logical request.
//! - Aggregate per-query latency and execution counts in process.
//!
//! # Invariants
//! - Metrics are recorded for every repository call, with or without a
//!   monitoring context.

pub mod context;
pub mod metrics;

pub use context::MonitoringContext;
pub use metrics::{OperationSnapshot, QueryMetrics, DURATION_BUCKETS_MS};
