//! Database subsystem for deltastore
//!
//! Owns the name-to-collection map, routes single queries, and runs
//! multi-collection transactions with snapshot and rollback.
//!
//! # Guarantees
//!
//! 1. Query execution reports failures as results, never as errors.
//! 2. A transaction applies all of its queries or none of them.
//! 3. Listeners of a touched collection fire once per committed
//!    transaction.
//!
//! Execution is single-threaded and synchronous. Callers sharing a
//! database across threads must serialize access themselves.

mod config;
mod database;
mod errors;
mod transaction;

pub use config::DatabaseConfig;
pub use database::{Database, MUST_AFFECT_FAILED, UNEXPECTED_ERROR};
pub use errors::{DatabaseError, DatabaseResult};
pub use transaction::TRANSACTION_FAILED;
