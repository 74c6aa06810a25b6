//! Query and transaction results
//!
//! Counts are signed: `-1` marks a result produced by a failure that
//! never reached the collection operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::QueryError;
use super::query::QueryType;
use crate::canonical::{class_name_of, required_array, tagged_dict, Dict, DictSerializable, Record};

/// Outcome of a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub is_success: bool,
    #[serde(rename = "type")]
    pub query_type: QueryType,
    /// Copies of returned records
    pub result: Vec<Record>,
    /// Collection length after the operation
    pub db_length: usize,
    pub update_count: i64,
    pub hit_count: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl QueryResult {
    pub fn success(
        query_type: QueryType,
        result: Vec<Record>,
        db_length: usize,
        update_count: usize,
        hit_count: usize,
    ) -> Self {
        Self {
            is_success: true,
            query_type,
            result,
            db_length,
            update_count: count(update_count),
            hit_count: count(hit_count),
            error_message: None,
        }
    }

    /// Failure reported by the operation itself; nothing was changed.
    pub fn rejected(query_type: QueryType, db_length: usize, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            query_type,
            result: Vec::new(),
            db_length,
            update_count: 0,
            hit_count: 0,
            error_message: Some(message.into()),
        }
    }

    /// Failure caught before or outside the operation; counts are `-1`.
    pub fn errored(query_type: QueryType, db_length: usize, message: impl Into<String>) -> Self {
        Self {
            update_count: -1,
            hit_count: -1,
            ..Self::rejected(query_type, db_length, message)
        }
    }

    /// Maps every returned record through `from_dict`.
    pub fn convert<T, E>(&self, from_dict: impl Fn(&Record) -> Result<T, E>) -> Result<Vec<T>, E> {
        self.result.iter().map(from_dict).collect()
    }
}

impl DictSerializable for QueryResult {
    const CLASS_NAME: &'static str = "QueryResult";
    const VERSION: &'static str = "4";
    type Error = QueryError;

    fn to_dict(&self) -> Dict {
        tagged_dict(self, Self::CLASS_NAME, Self::VERSION)
    }

    fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        serde_json::from_value(Value::Object(src.clone())).map_err(|e| QueryError::Malformed {
            class_name: Self::CLASS_NAME,
            reason: e.to_string(),
        })
    }
}

/// Outcome of a transaction. On failure `results` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQueryResult {
    pub is_success: bool,
    pub results: Vec<QueryResult>,
    pub error_message: Option<String>,
}

impl TransactionQueryResult {
    pub fn committed(results: Vec<QueryResult>) -> Self {
        Self {
            is_success: true,
            results,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            results: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}

impl DictSerializable for TransactionQueryResult {
    const CLASS_NAME: &'static str = "TransactionQueryResult";
    const VERSION: &'static str = "2";
    type Error = QueryError;

    fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        dict.insert("className".into(), Value::from(Self::CLASS_NAME));
        dict.insert("version".into(), Value::from(Self::VERSION));
        dict.insert("isSuccess".into(), Value::Bool(self.is_success));
        dict.insert(
            "results".into(),
            Value::Array(
                self.results
                    .iter()
                    .map(|r| Value::Object(r.to_dict()))
                    .collect(),
            ),
        );
        dict.insert(
            "errorMessage".into(),
            self.error_message
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        dict
    }

    fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        let is_success = src
            .get("isSuccess")
            .and_then(Value::as_bool)
            .ok_or(QueryError::InvalidField {
                context: Self::CLASS_NAME,
                field: "isSuccess",
                expected: "boolean",
            })?;
        let results = required_array(src, Self::CLASS_NAME, "results")?
            .iter()
            .map(|item| {
                let r = item.as_object().ok_or(QueryError::InvalidField {
                    context: Self::CLASS_NAME,
                    field: "results",
                    expected: "array of objects",
                })?;
                QueryResult::from_dict(r)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let error_message = src
            .get("errorMessage")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            is_success,
            results,
            error_message,
        })
    }
}

/// Either kind of result, as returned by polymorphic execution.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExecutionResult {
    Query(QueryResult),
    Transaction(TransactionQueryResult),
}

impl QueryExecutionResult {
    pub fn is_success(&self) -> bool {
        match self {
            QueryExecutionResult::Query(r) => r.is_success,
            QueryExecutionResult::Transaction(r) => r.is_success,
        }
    }

    pub fn to_dict(&self) -> Dict {
        match self {
            QueryExecutionResult::Query(r) => r.to_dict(),
            QueryExecutionResult::Transaction(r) => r.to_dict(),
        }
    }

    /// Restores whichever result kind the `className` tag names.
    pub fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        match class_name_of(src) {
            Some(name) if name == QueryResult::CLASS_NAME => {
                QueryResult::from_dict(src).map(Self::Query)
            }
            Some(name) if name == TransactionQueryResult::CLASS_NAME => {
                TransactionQueryResult::from_dict(src).map(Self::Transaction)
            }
            other => Err(QueryError::Malformed {
                class_name: "QueryExecutionResult",
                reason: format!("unsupported className {:?}", other),
            }),
        }
    }
}

impl From<QueryResult> for QueryExecutionResult {
    fn from(r: QueryResult) -> Self {
        QueryExecutionResult::Query(r)
    }
}

impl From<TransactionQueryResult> for QueryExecutionResult {
    fn from(r: TransactionQueryResult) -> Self {
        QueryExecutionResult::Transaction(r)
    }
}
