//! deltastore - An embeddable, in-memory, schema-less document store
//!
//! Records live in named collections and are queried through composable
//! predicate trees. Multi-collection transactions are all-or-nothing via
//! whole-collection snapshot and rollback.
//!
//! # Usage
//!
//! ```ignore
//! use deltastore::db::Database;
//! use deltastore::query::{Query, QueryNode, TransactionQuery};
//!
//! let mut db = Database::new();
//! db.execute_query(&Query::add("users", records));
//! let found = db.execute_query(&Query::search(
//!     "users",
//!     QueryNode::greater_or_equal("age", json!(18)),
//! ));
//! ```

pub mod canonical;
pub mod collection;
pub mod db;
pub mod observability;
pub mod query;

pub use canonical::{DictSerializable, Record};
pub use collection::{Collection, ListenerId};
pub use db::{Database, DatabaseConfig};
pub use query::{
    Query, QueryExecutionResult, QueryNode, QueryResult, QueryType, SingleSort, TransactionQuery,
    TransactionQueryResult, ValueType,
};
