//! Engine counters
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::report::{ErrorCategory, ErrorCode};

/// Operational counters shared by every request
#[derive(Debug, Default)]
pub struct QueryMetrics {
    plans_received: AtomicU64,
    plans_rejected: AtomicU64,
    pages_requested: AtomicU64,
    tokens_rejected: AtomicU64,
    queries_succeeded: AtomicU64,
    execution_timeouts: AtomicU64,
    execution_failures: AtomicU64,
    rows_returned: AtomicU64,
    catalog_reloads: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_plan(&self) {
        self.plans_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_request(&self) {
        self.pages_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, rows: usize) {
        self.queries_succeeded.fetch_add(1, Ordering::Relaxed);
        self.rows_returned.fetch_add(rows as u64, Ordering::Relaxed);
    }

    /// Counts a failure under its category
    pub fn record_failure(&self, code: ErrorCode) {
        let counter = match (code.category(), code) {
            (ErrorCategory::Validation, _) => &self.plans_rejected,
            (ErrorCategory::Pagination, _) => &self.tokens_rejected,
            (ErrorCategory::Backend, ErrorCode::ExecutionTimeout) => &self.execution_timeouts,
            (ErrorCategory::Backend, _) => &self.execution_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_catalog_reload(&self) {
        self.catalog_reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_received: self.plans_received.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            pages_requested: self.pages_requested.load(Ordering::Relaxed),
            tokens_rejected: self.tokens_rejected.load(Ordering::Relaxed),
            queries_succeeded: self.queries_succeeded.load(Ordering::Relaxed),
            execution_timeouts: self.execution_timeouts.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            catalog_reloads: self.catalog_reloads.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_received: u64,
    pub plans_rejected: u64,
    pub pages_requested: u64,
    pub tokens_rejected: u64,
    pub queries_succeeded: u64,
    pub execution_timeouts: u64,
    pub execution_failures: u64,
    pub rows_returned: u64,
    pub catalog_reloads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_failures_counted_by_category() {
        let metrics = QueryMetrics::new();
        metrics.record_failure(ErrorCode::InvalidFilter);
        metrics.record_failure(ErrorCode::StaleQuery);
        metrics.record_failure(ErrorCode::ExecutionTimeout);
        metrics.record_failure(ErrorCode::ExecutionFailure);
        metrics.record_failure(ErrorCode::ExecutionFailure);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.plans_rejected, 1);
        assert_eq!(snapshot.tokens_rejected, 1);
        assert_eq!(snapshot.execution_timeouts, 1);
        assert_eq!(snapshot.execution_failures, 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(QueryMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_plan();
                        metrics.record_success(2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.plans_received, 800);
        assert_eq!(snapshot.rows_returned, 1600);
    }

    #[test]
    fn test_snapshot_serializes() {
        let value = serde_json::to_value(QueryMetrics::new().snapshot()).unwrap();
        assert_eq!(value["catalog_reloads"], 0);
    }
}
