//! Metrics registry for deltastore
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of operational counters.
///
/// Uses Relaxed ordering; counters are independent of one another.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Queries that returned a success result
    queries_executed: AtomicU64,
    /// Queries that returned a failure result
    queries_failed: AtomicU64,
    /// Committed transactions
    transactions_committed: AtomicU64,
    /// Rolled back transactions
    transactions_rolled_back: AtomicU64,
    /// Collection snapshots captured for transactions
    snapshots_captured: AtomicU64,
    /// Listener batches delivered
    listener_notifications: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_snapshots(&self, count: u64) {
        self.snapshots_captured.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_listener_notifications(&self) {
        self.listener_notifications.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            snapshots_captured: self.snapshots_captured.load(Ordering::Relaxed),
            listener_notifications: self.listener_notifications.load(Ordering::Relaxed),
        }
    }

    /// Current values rendered as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
    pub snapshots_captured: u64,
    pub listener_notifications: u64,
}
