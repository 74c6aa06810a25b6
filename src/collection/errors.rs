//! Collection errors
//!
//! Error codes:
//! - DELTA_INVALID_QUERY: query payload missing what its type needs
//! - codes of wrapped `QueryError`s pass through unchanged

use thiserror::Error;

use crate::query::QueryError;

/// Errors raised by collection operations.
///
/// Result-level failures (rename conflicts and the like) are reported as
/// unsuccessful `QueryResult`s instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectionError {
    /// The query lacks a field its type requires
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl CollectionError {
    pub(crate) fn missing(field: &str, query_type: &str) -> Self {
        CollectionError::InvalidQuery(format!("{} is required for {}", field, query_type))
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CollectionError::InvalidQuery(_) => "DELTA_INVALID_QUERY",
            CollectionError::Query(e) => e.code(),
        }
    }

    /// Returns true if the caller sent a bad query; its message is safe to
    /// return in a result.
    pub fn is_invalid_query(&self) -> bool {
        match self {
            CollectionError::InvalidQuery(_) => true,
            CollectionError::Query(e) => e.is_decode_error(),
        }
    }
}
