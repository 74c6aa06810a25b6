//! Database errors
//!
//! Error codes:
//! - DELTA_MALFORMED_DICT: database or collection dictionary is malformed
//! - DELTA_UNSUPPORTED_CLASS: `className` is not an executable query
//! - DELTA_INVALID_CONFIG: configuration could not be parsed
//!
//! Query execution itself never returns these: failures there become
//! unsuccessful results.

use thiserror::Error;

use crate::collection::CollectionError;
use crate::query::QueryError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatabaseError {
    #[error("Invalid format: {0}")]
    Malformed(String),

    #[error("Unsupported query class: {0}")]
    UnsupportedClass(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl DatabaseError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DatabaseError::Malformed(_) => "DELTA_MALFORMED_DICT",
            DatabaseError::UnsupportedClass(_) => "DELTA_UNSUPPORTED_CLASS",
            DatabaseError::Config(_) => "DELTA_INVALID_CONFIG",
            DatabaseError::Query(e) => e.code(),
            DatabaseError::Collection(e) => e.code(),
        }
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
