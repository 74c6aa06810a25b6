//! Database configuration

use serde::{Deserialize, Serialize};

use super::errors::{DatabaseError, DatabaseResult};
use crate::observability::Severity;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Lowest severity written by the logger (default: WARN)
    #[serde(default)]
    pub min_log_severity: Severity,

    /// Count queries, transactions and notifications (default: true)
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Drop collections a failed transaction created (default: true).
    /// When false they are left behind empty.
    #[serde(default = "default_true")]
    pub remove_created_collections_on_rollback: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            min_log_severity: Severity::default(),
            metrics_enabled: default_true(),
            remove_created_collections_on_rollback: default_true(),
        }
    }
}

impl DatabaseConfig {
    /// Parses a JSON config; absent keys take their defaults.
    pub fn from_json_str(src: &str) -> DatabaseResult<Self> {
        serde_json::from_str(src).map_err(|e| DatabaseError::Config(e.to_string()))
    }
}
