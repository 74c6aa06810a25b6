//! Type-aware value comparison
//!
//! A comparison node pairs a literal with a [`ValueType`] tag that decides
//! how the resolved field value and the literal are coerced before they are
//! compared. Every function here returns `None` on a coercion failure; the
//! caller folds that into `false`.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde_json::{Number, Value};

use super::errors::QueryError;
use super::timestamp::Timestamp;

/// Tolerance used by [`ValueType::FloatEpsilon`].
pub const FLOAT_EPSILON: f64 = 1e-12;

/// Coercion rule applied when comparing a field value to a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// Native representations, no coercion
    #[default]
    Auto,
    /// Both sides parsed as ISO-8601 timestamps
    Datetime,
    /// Both sides parsed as integers
    Int,
    /// Both sides parsed as floats, exact comparison
    FloatStrict,
    /// Both sides parsed as floats, equal within 1e-12
    FloatEpsilon,
    /// Case-insensitive "true"/"false" comparison; no ordering
    Boolean,
    /// String forms compared
    String,
}

impl ValueType {
    /// Wire name used in the `vType` field
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Auto => "auto_",
            ValueType::Datetime => "datetime_",
            ValueType::Int => "int_",
            ValueType::FloatStrict => "floatStrict_",
            ValueType::FloatEpsilon => "floatEpsilon12_",
            ValueType::Boolean => "boolean_",
            ValueType::String => "string_",
        }
    }

    /// Looks up a value type by its wire name
    pub fn from_name(name: &str) -> Result<Self, QueryError> {
        match name {
            "auto_" => Ok(ValueType::Auto),
            "datetime_" => Ok(ValueType::Datetime),
            "int_" => Ok(ValueType::Int),
            "floatStrict_" => Ok(ValueType::FloatStrict),
            "floatEpsilon12_" => Ok(ValueType::FloatEpsilon),
            "boolean_" => Ok(ValueType::Boolean),
            "string_" => Ok(ValueType::String),
            other => Err(QueryError::UnknownValueType(other.to_string())),
        }
    }

    /// Equality under this coercion rule. An absent field compares as null.
    pub fn equals(self, actual: Option<&Value>, expected: &Operand) -> Option<bool> {
        let actual = actual.unwrap_or(&Value::Null);
        match self {
            ValueType::Auto => Some(loosely_equal(actual, &expected.to_value())),
            ValueType::Datetime => {
                let a = Timestamp::parse(&string_form(actual))?;
                let b = expected.timestamp()?;
                // Aware against naive is unequal, not a coercion failure
                Some(a.compare(&b) == Some(Ordering::Equal))
            }
            ValueType::Int => Some(parse_int(&string_form(actual))? == expected.as_int()?),
            ValueType::FloatStrict => {
                Some(parse_float(&string_form(actual))? == expected.as_float()?)
            }
            ValueType::FloatEpsilon => {
                let diff = parse_float(&string_form(actual))? - expected.as_float()?;
                Some(diff.abs() < FLOAT_EPSILON)
            }
            ValueType::Boolean => Some(
                string_form(actual).to_lowercase() == expected.string_form().to_lowercase(),
            ),
            ValueType::String => Some(string_form(actual) == expected.string_form()),
        }
    }

    /// Ordering of `actual` relative to `expected` under this coercion rule.
    ///
    /// Callers must exclude absent/null operands first. `Boolean` has no
    /// ordering.
    pub fn ordering(self, actual: &Value, expected: &Operand) -> Option<Ordering> {
        match self {
            ValueType::Auto => native_cmp(actual, &expected.to_value()),
            ValueType::Datetime => {
                Timestamp::parse(&string_form(actual))?.compare(&expected.timestamp()?)
            }
            ValueType::Int => Some(parse_int(&string_form(actual))?.cmp(&expected.as_int()?)),
            ValueType::FloatStrict => {
                parse_float(&string_form(actual))?.partial_cmp(&expected.as_float()?)
            }
            ValueType::FloatEpsilon => {
                let diff = parse_float(&string_form(actual))? - expected.as_float()?;
                if diff.is_nan() {
                    None
                } else if diff > FLOAT_EPSILON {
                    Some(Ordering::Greater)
                } else if -diff > FLOAT_EPSILON {
                    Some(Ordering::Less)
                } else {
                    Some(Ordering::Equal)
                }
            }
            ValueType::Boolean => None,
            ValueType::String => Some(string_form(actual).cmp(&expected.string_form())),
        }
    }
}

/// Literal operand of a comparison node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Plain JSON literal
    Value(Value),
    /// Timestamp literal; forces the node's value type to `datetime_`
    Timestamp(Timestamp),
}

impl Operand {
    /// JSON form of the literal (timestamps render as ISO-8601 strings)
    pub fn to_value(&self) -> Cow<'_, Value> {
        match self {
            Operand::Value(v) => Cow::Borrowed(v),
            Operand::Timestamp(ts) => Cow::Owned(Value::String(ts.to_iso_string())),
        }
    }

    /// Returns true for a `null` literal
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }

    fn string_form(&self) -> Cow<'_, str> {
        match self {
            Operand::Value(v) => string_form(v),
            Operand::Timestamp(ts) => Cow::Owned(ts.to_iso_string()),
        }
    }

    fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Operand::Timestamp(ts) => Some(*ts),
            Operand::Value(v) => Timestamp::parse(&string_form(v)),
        }
    }

    fn as_int(&self) -> Option<i64> {
        parse_int(&self.string_form())
    }

    fn as_float(&self) -> Option<f64> {
        parse_float(&self.string_form())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Value(Value::from(s))
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Value(Value::String(s))
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Operand::Value(Value::from(n))
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Value(Value::from(n))
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Value(Value::Bool(b))
    }
}

impl From<Timestamp> for Operand {
    fn from(ts: Timestamp) -> Self {
        Operand::Timestamp(ts)
    }
}

impl From<DateTime<FixedOffset>> for Operand {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Operand::Timestamp(dt.into())
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(dt: DateTime<Utc>) -> Self {
        Operand::Timestamp(dt.into())
    }
}

impl From<NaiveDateTime> for Operand {
    fn from(dt: NaiveDateTime) -> Self {
        Operand::Timestamp(dt.into())
    }
}

/// String form of a value: strings verbatim, everything else as JSON text.
pub(crate) fn string_form(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

fn parse_int(src: &str) -> Option<i64> {
    src.trim().parse().ok()
}

fn parse_float(src: &str) -> Option<f64> {
    src.trim().parse().ok()
}

/// Native equality with integer/float unification (`1 == 1.0`).
pub(crate) fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| loosely_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| loosely_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Native ordering for booleans, numbers, strings and arrays of those.
/// Mixed families have no ordering.
pub(crate) fn native_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                if !loosely_equal(x, y) {
                    return native_cmp(x, y);
                }
            }
            Some(xs.len().cmp(&ys.len()))
        }
        _ => None,
    }
}

pub(crate) fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (x.as_i64(), y.as_i64()) {
        (Some(i), Some(j)) => Some(i.cmp(&j)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}
