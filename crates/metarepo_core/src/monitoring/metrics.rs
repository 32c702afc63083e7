//! In-process latency histogram and execution counter per query.
//!
//! Series are keyed by `(entity type, query name)`; a sink exports each as a
//! `db_query_duration_ms` histogram plus a `db_query_executions` counter.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Upper bounds (inclusive) of the latency buckets in milliseconds.
/// Slower executions land in one trailing overflow bucket.
pub const DURATION_BUCKETS_MS: [u64; 8] = [1, 5, 10, 25, 50, 100, 250, 1000];

#[derive(Debug, Default, Clone, Copy)]
struct OperationStats {
    executions: u64,
    total_duration_us: u64,
    max_duration_us: u64,
    buckets: [u64; DURATION_BUCKETS_MS.len() + 1],
}

/// Immutable view of one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSnapshot {
    pub entity: String,
    pub query: String,
    pub executions: u64,
    pub total_duration_us: u64,
    pub max_duration_us: u64,
    /// Counts per entry of [`DURATION_BUCKETS_MS`], then the overflow count.
    pub buckets: Vec<u64>,
}

/// Aggregated repository query metrics.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    by_operation: Mutex<BTreeMap<(String, String), OperationStats>>,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one execution of `query` for `entity`.
    pub fn record(&self, entity: &str, query: &str, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let millis = micros / 1_000;
        let bucket = DURATION_BUCKETS_MS
            .iter()
            .position(|bound| millis <= *bound)
            .unwrap_or(DURATION_BUCKETS_MS.len());

        let mut guard = self
            .by_operation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let stats = guard
            .entry((entity.to_string(), query.to_string()))
            .or_default();
        stats.executions = stats.executions.saturating_add(1);
        stats.total_duration_us = stats.total_duration_us.saturating_add(micros);
        stats.max_duration_us = stats.max_duration_us.max(micros);
        stats.buckets[bucket] = stats.buckets[bucket].saturating_add(1);
    }

    /// Execution count for one series, `0` when never recorded.
    pub fn executions(&self, entity: &str, query: &str) -> u64 {
        let guard = self
            .by_operation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&(entity.to_string(), query.to_string()))
            .map(|stats| stats.executions)
            .unwrap_or(0)
    }

    /// Snapshot of every series, sorted by entity then query.
    pub fn snapshot(&self) -> Vec<OperationSnapshot> {
        let guard = self
            .by_operation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .iter()
            .map(|((entity, query), stats)| OperationSnapshot {
                entity: entity.clone(),
                query: query.clone(),
                executions: stats.executions,
                total_duration_us: stats.total_duration_us,
                max_duration_us: stats.max_duration_us,
                buckets: stats.buckets.to_vec(),
            })
            .collect()
    }
}
