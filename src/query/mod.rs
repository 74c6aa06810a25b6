//! Query subsystem for deltastore
//!
//! Predicate trees, value coercion, sorting, and the canonical forms of
//! queries and their results.
//!
//! # Evaluation rules
//!
//! 1. Predicate evaluation is total; it never raises and never mutates.
//! 2. Coercion failures make a comparison false.
//! 3. Sorting incompatible value families is an error.
//!
//! # Usage
//!
//! ```ignore
//! use deltastore::query::{Query, QueryNode, SingleSort};
//!
//! let node = QueryNode::and(vec![
//!     QueryNode::greater_or_equal("age", json!(18)),
//!     QueryNode::starts_with("name", "A"),
//! ]);
//! let query = Query::search("users", node).with_sort(SingleSort::desc("age"));
//! ```

mod ast;
mod codec;
mod compare;
mod errors;
mod field;
mod filters;
#[allow(clippy::module_inception)]
mod query;
mod result;
mod sorter;
mod timestamp;

pub use ast::{Comparison, FieldAffix, FieldValue, Membership, NodeType, QueryNode, RegexMatch};
pub use compare::{Operand, ValueType, FLOAT_EPSILON};
pub use errors::QueryError;
pub use field::resolve_field;
pub use query::{Query, QueryType, TransactionQuery};
pub use result::{QueryExecutionResult, QueryResult, TransactionQueryResult};
pub use sorter::SingleSort;
pub use timestamp::Timestamp;
