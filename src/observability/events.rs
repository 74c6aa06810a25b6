//! Observable events for deltastore

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Database configuration applied
    ConfigLoaded,

    // Query operations
    /// Query executed successfully
    QueryExecuted,
    /// Query reported a failure result
    QueryRejected,
    /// Query raised an unexpected error
    QueryFailed,

    // Transactions
    /// Transaction started
    TransactionBegin,
    /// Transaction committed
    TransactionCommit,
    /// Transaction rolled back
    TransactionRollback,

    // Snapshots
    /// Collection snapshot captured
    SnapshotCaptured,
    /// Collection restored from snapshot
    SnapshotRestored,

    // Listeners
    /// Collection listeners invoked
    ListenersNotified,

    // Import
    /// Database or collection replaced from dictionary form
    DictImported,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionCommit => "TRANSACTION_COMMIT",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::SnapshotCaptured => "SNAPSHOT_CAPTURED",
            Event::SnapshotRestored => "SNAPSHOT_RESTORED",
            Event::ListenersNotified => "LISTENERS_NOTIFIED",
            Event::DictImported => "DICT_IMPORTED",
        }
    }

    /// Default severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryFailed => Severity::Error,
            Event::QueryRejected | Event::TransactionRollback => Severity::Warn,
            Event::QueryExecuted | Event::SnapshotCaptured | Event::ListenersNotified => {
                Severity::Trace
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
