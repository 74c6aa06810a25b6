//! Canonical dictionary form shared by every persistent entity
//!
//! Entities cross the storage/wire boundary as JSON maps carrying a
//! `className` tag and a `version` string next to their own fields.
//! Unknown fields are ignored on read.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::query::QueryError;

/// A canonical-form map (`className`, `version`, type-specific fields).
pub type Dict = Map<String, Value>;

/// One stored document: a string-keyed map of dynamically typed values.
pub type Record = Map<String, Value>;

/// Contract for entities with a canonical dictionary form.
pub trait DictSerializable: Sized {
    /// Value of the `className` tag
    const CLASS_NAME: &'static str;
    /// Value of the `version` tag
    const VERSION: &'static str;

    /// Error produced when a dictionary cannot be restored
    type Error;

    /// Converts the entity into its canonical dictionary form.
    fn to_dict(&self) -> Dict;

    /// Restores the entity from its canonical dictionary form.
    fn from_dict(src: &Dict) -> Result<Self, Self::Error>;

    /// Deep copy through the canonical form.
    fn clone_via_dict(&self) -> Result<Self, Self::Error> {
        Self::from_dict(&self.to_dict())
    }
}

/// Serializes a derived struct and stamps it with `className`/`version`.
pub(crate) fn tagged_dict<T: Serialize>(body: &T, class_name: &str, version: &str) -> Dict {
    let mut dict = match serde_json::to_value(body) {
        Ok(Value::Object(map)) => map,
        _ => Dict::new(),
    };
    dict.insert("className".into(), Value::from(class_name));
    dict.insert("version".into(), Value::from(version));
    dict
}

/// Returns the `className` tag of a dictionary, if any.
pub fn class_name_of(src: &Dict) -> Option<&str> {
    src.get("className").and_then(Value::as_str)
}

pub(crate) fn required<'a>(
    src: &'a Dict,
    context: &'static str,
    field: &'static str,
) -> Result<&'a Value, QueryError> {
    src.get(field)
        .ok_or(QueryError::MissingField { context, field })
}

pub(crate) fn required_str<'a>(
    src: &'a Dict,
    context: &'static str,
    field: &'static str,
) -> Result<&'a str, QueryError> {
    required(src, context, field)?
        .as_str()
        .ok_or(QueryError::InvalidField {
            context,
            field,
            expected: "string",
        })
}

pub(crate) fn required_object<'a>(
    src: &'a Dict,
    context: &'static str,
    field: &'static str,
) -> Result<&'a Dict, QueryError> {
    required(src, context, field)?
        .as_object()
        .ok_or(QueryError::InvalidField {
            context,
            field,
            expected: "object",
        })
}

pub(crate) fn required_array<'a>(
    src: &'a Dict,
    context: &'static str,
    field: &'static str,
) -> Result<&'a Vec<Value>, QueryError> {
    required(src, context, field)?
        .as_array()
        .ok_or(QueryError::InvalidField {
            context,
            field,
            expected: "array",
        })
}

/// Reads a list of records, rejecting non-object entries.
pub(crate) fn records_from(
    values: &[Value],
    context: &'static str,
    field: &'static str,
) -> Result<Vec<Record>, QueryError> {
    values
        .iter()
        .map(|v| {
            v.as_object().cloned().ok_or(QueryError::InvalidField {
                context,
                field,
                expected: "array of objects",
            })
        })
        .collect()
}
