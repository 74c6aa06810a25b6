//! Predicate evaluation
//!
//! Evaluation is total: absent fields and coercion failures make a
//! comparison false, nothing here returns an error or mutates the record.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{Comparison, FieldAffix, FieldValue, Membership, QueryNode, RegexMatch};
use super::compare::{loosely_equal, string_form};
use super::field::{resolve_field, resolve_present};
use crate::canonical::Record;

impl QueryNode {
    /// Evaluates the predicate against a record.
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            QueryNode::And(children) => children.iter().all(|c| c.evaluate(record)),
            QueryNode::Or(children) => children.iter().any(|c| c.evaluate(record)),
            QueryNode::Not(child) => !child.evaluate(record),
            QueryNode::Equals(c) => equals(record, c).unwrap_or(false),
            QueryNode::NotEquals(c) => equals(record, c).map(|eq| !eq).unwrap_or(false),
            QueryNode::GreaterThan(c) => ordering_is(record, c, |o| o == Ordering::Greater),
            QueryNode::LessThan(c) => ordering_is(record, c, |o| o == Ordering::Less),
            QueryNode::GreaterOrEqual(c) => ordering_is(record, c, |o| o != Ordering::Less),
            QueryNode::LessOrEqual(c) => ordering_is(record, c, |o| o != Ordering::Greater),
            QueryNode::MatchesRegex(m) => regex_match(record, m),
            QueryNode::Contains(fv) => contains(record, fv),
            QueryNode::In(m) => is_member(record, m),
            QueryNode::NotIn(m) => !is_member(record, m),
            QueryNode::StartsWith(a) => affix_match(record, a, |s, p| s.starts_with(p)),
            QueryNode::EndsWith(a) => affix_match(record, a, |s, p| s.ends_with(p)),
        }
    }
}

fn equals(record: &Record, c: &Comparison) -> Option<bool> {
    c.value_type
        .equals(resolve_field(record, &c.field), &c.value)
}

/// Ordering comparisons are false on an absent/null field or a null literal.
fn ordering_is(record: &Record, c: &Comparison, accept: impl Fn(Ordering) -> bool) -> bool {
    if c.value.is_null() {
        return false;
    }
    resolve_present(record, &c.field)
        .and_then(|actual| c.value_type.ordering(actual, &c.value))
        .is_some_and(accept)
}

fn regex_match(record: &Record, m: &RegexMatch) -> bool {
    let (Some(actual), Some(re)) = (resolve_present(record, &m.field), &m.compiled) else {
        return false;
    };
    re.is_match(&string_form(actual))
}

fn contains(record: &Record, fv: &FieldValue) -> bool {
    match (resolve_field(record, &fv.field), &fv.value) {
        (Some(Value::Array(items)), needle) => items.iter().any(|i| loosely_equal(i, needle)),
        (Some(Value::String(haystack)), Value::String(needle)) => haystack.contains(needle.as_str()),
        _ => false,
    }
}

/// Absent fields take part as `null`.
fn is_member(record: &Record, m: &Membership) -> bool {
    let actual = resolve_field(record, &m.field).unwrap_or(&Value::Null);
    m.values.iter().any(|v| loosely_equal(actual, v))
}

fn affix_match(record: &Record, a: &FieldAffix, test: impl Fn(&str, &str) -> bool) -> bool {
    resolve_present(record, &a.field)
        .map(|actual| test(&string_form(actual), &a.affix))
        .unwrap_or(false)
}
