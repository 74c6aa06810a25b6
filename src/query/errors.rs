//! Query subsystem errors
//!
//! Error codes:
//! - DELTA_UNKNOWN_TAG: unknown node, value or query type tag
//! - DELTA_MALFORMED_DICT: missing or ill-typed canonical field
//! - DELTA_NOT_COMPARABLE: sort keys of incompatible value families

use thiserror::Error;

/// Errors raised while decoding queries or ordering records.
///
/// Predicate evaluation never produces these; coercion failures there
/// evaluate to `false` instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Node dictionary carried an unregistered `type` tag
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Comparison node carried an unregistered `vType` tag
    #[error("Unknown value type: {0}")]
    UnknownValueType(String),

    /// Query dictionary carried an unregistered `type` tag
    #[error("Unknown query type: {0}")]
    UnknownQueryType(String),

    /// A required canonical field is absent
    #[error("Missing field '{field}' in {context}")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },

    /// A canonical field has the wrong JSON type
    #[error("Field '{field}' in {context} must be {expected}")]
    InvalidField {
        context: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    /// A canonical dictionary could not be decoded
    #[error("Malformed {class_name}: {reason}")]
    Malformed {
        class_name: &'static str,
        reason: String,
    },

    /// Sort keys belong to incompatible value families
    #[error("Field \"{field}\" is not comparable: {left}, {right}")]
    NotComparable {
        field: String,
        left: String,
        right: String,
    },
}

impl QueryError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownNodeType(_)
            | QueryError::UnknownValueType(_)
            | QueryError::UnknownQueryType(_) => "DELTA_UNKNOWN_TAG",
            QueryError::MissingField { .. }
            | QueryError::InvalidField { .. }
            | QueryError::Malformed { .. } => "DELTA_MALFORMED_DICT",
            QueryError::NotComparable { .. } => "DELTA_NOT_COMPARABLE",
        }
    }

    /// Returns true if the error describes bad caller input rather than
    /// a failure during execution.
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, QueryError::NotComparable { .. })
    }
}
