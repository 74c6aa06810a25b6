//! Query node AST
//!
//! A predicate tree of logical combinators and per-field comparisons.
//! Evaluation lives in `filters.rs`, the dictionary codec in `codec.rs`.

use regex::Regex;
use serde_json::Value;

use super::compare::{Operand, ValueType};
use super::errors::QueryError;

/// Tag of every node variant, with its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    And,
    Or,
    Not,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    MatchesRegex,
    Contains,
    In,
    NotIn,
    StartsWith,
    EndsWith,
}

impl NodeType {
    /// Wire name used in the `type` field
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::And => "and_",
            NodeType::Or => "or_",
            NodeType::Not => "not_",
            NodeType::Equals => "equals_",
            NodeType::NotEquals => "notEquals_",
            NodeType::GreaterThan => "greaterThan_",
            NodeType::LessThan => "lessThan_",
            NodeType::GreaterOrEqual => "greaterThanOrEqual_",
            NodeType::LessOrEqual => "lessThanOrEqual_",
            NodeType::MatchesRegex => "regex_",
            NodeType::Contains => "contains_",
            NodeType::In => "in_",
            NodeType::NotIn => "notIn_",
            NodeType::StartsWith => "startsWith_",
            NodeType::EndsWith => "endsWith_",
        }
    }

    /// Looks up a node type by its wire name
    pub fn from_name(name: &str) -> Result<Self, QueryError> {
        match name {
            "and_" => Ok(NodeType::And),
            "or_" => Ok(NodeType::Or),
            "not_" => Ok(NodeType::Not),
            "equals_" => Ok(NodeType::Equals),
            "notEquals_" => Ok(NodeType::NotEquals),
            "greaterThan_" => Ok(NodeType::GreaterThan),
            "lessThan_" => Ok(NodeType::LessThan),
            "greaterThanOrEqual_" => Ok(NodeType::GreaterOrEqual),
            "lessThanOrEqual_" => Ok(NodeType::LessOrEqual),
            "regex_" => Ok(NodeType::MatchesRegex),
            "contains_" => Ok(NodeType::Contains),
            "in_" => Ok(NodeType::In),
            "notIn_" => Ok(NodeType::NotIn),
            "startsWith_" => Ok(NodeType::StartsWith),
            "endsWith_" => Ok(NodeType::EndsWith),
            other => Err(QueryError::UnknownNodeType(other.to_string())),
        }
    }
}

/// Field compared against a literal under a coercion rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub(crate) field: String,
    pub(crate) value: Operand,
    pub(crate) value_type: ValueType,
}

impl Comparison {
    /// Creates a comparison. A timestamp literal forces `ValueType::Datetime`.
    pub fn new(field: impl Into<String>, value: impl Into<Operand>, value_type: ValueType) -> Self {
        let value = value.into();
        let value_type = match value {
            Operand::Timestamp(_) => ValueType::Datetime,
            Operand::Value(_) => value_type,
        };
        Self {
            field: field.into(),
            value,
            value_type,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Operand {
        &self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// Regex search over a field's string form.
///
/// The pattern is compiled once; a pattern the engine rejects matches
/// nothing.
#[derive(Debug, Clone)]
pub struct RegexMatch {
    pub(crate) field: String,
    pub(crate) pattern: String,
    pub(crate) compiled: Option<Regex>,
}

impl RegexMatch {
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            field: field.into(),
            compiled: Regex::new(&pattern).ok(),
            pattern,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for RegexMatch {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.pattern == other.pattern
    }
}

/// Field paired with a single literal (`contains_`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field: String,
    pub value: Value,
}

/// Field paired with a string affix (`startsWith_`, `endsWith_`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAffix {
    pub field: String,
    pub affix: String,
}

/// Field paired with a literal list (`in_`, `notIn_`).
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub field: String,
    pub values: Vec<Value>,
}

/// A predicate tree element; evaluates a record to a boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// True iff every child is true (true when empty)
    And(Vec<QueryNode>),
    /// True iff any child is true (false when empty)
    Or(Vec<QueryNode>),
    /// Negates its child
    Not(Box<QueryNode>),
    Equals(Comparison),
    NotEquals(Comparison),
    GreaterThan(Comparison),
    LessThan(Comparison),
    GreaterOrEqual(Comparison),
    LessOrEqual(Comparison),
    MatchesRegex(RegexMatch),
    Contains(FieldValue),
    In(Membership),
    NotIn(Membership),
    StartsWith(FieldAffix),
    EndsWith(FieldAffix),
}

impl QueryNode {
    pub fn and(children: Vec<QueryNode>) -> Self {
        QueryNode::And(children)
    }

    pub fn or(children: Vec<QueryNode>) -> Self {
        QueryNode::Or(children)
    }

    pub fn not(child: QueryNode) -> Self {
        QueryNode::Not(Box::new(child))
    }

    /// `field == value` with `auto_` coercion
    pub fn equals(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        QueryNode::Equals(Comparison::new(field, value, ValueType::Auto))
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        QueryNode::NotEquals(Comparison::new(field, value, ValueType::Auto))
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        QueryNode::GreaterThan(Comparison::new(field, value, ValueType::Auto))
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        QueryNode::LessThan(Comparison::new(field, value, ValueType::Auto))
    }

    pub fn greater_or_equal(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        QueryNode::GreaterOrEqual(Comparison::new(field, value, ValueType::Auto))
    }

    pub fn less_or_equal(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        QueryNode::LessOrEqual(Comparison::new(field, value, ValueType::Auto))
    }

    pub fn matches_regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        QueryNode::MatchesRegex(RegexMatch::new(field, pattern))
    }

    pub fn contains(field: impl Into<String>, value: Value) -> Self {
        QueryNode::Contains(FieldValue {
            field: field.into(),
            value,
        })
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        QueryNode::In(Membership {
            field: field.into(),
            values,
        })
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        QueryNode::NotIn(Membership {
            field: field.into(),
            values,
        })
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        QueryNode::StartsWith(FieldAffix {
            field: field.into(),
            affix: prefix.into(),
        })
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        QueryNode::EndsWith(FieldAffix {
            field: field.into(),
            affix: suffix.into(),
        })
    }

    /// Replaces the coercion rule of a comparison node.
    ///
    /// Nodes holding a timestamp literal stay `datetime_`; non-comparison
    /// nodes are returned unchanged.
    pub fn with_value_type(self, value_type: ValueType) -> Self {
        let retag = |c: Comparison| Comparison::new(c.field, c.value, value_type);
        match self {
            QueryNode::Equals(c) => QueryNode::Equals(retag(c)),
            QueryNode::NotEquals(c) => QueryNode::NotEquals(retag(c)),
            QueryNode::GreaterThan(c) => QueryNode::GreaterThan(retag(c)),
            QueryNode::LessThan(c) => QueryNode::LessThan(retag(c)),
            QueryNode::GreaterOrEqual(c) => QueryNode::GreaterOrEqual(retag(c)),
            QueryNode::LessOrEqual(c) => QueryNode::LessOrEqual(retag(c)),
            other => other,
        }
    }

    /// Returns the variant tag
    pub fn node_type(&self) -> NodeType {
        match self {
            QueryNode::And(_) => NodeType::And,
            QueryNode::Or(_) => NodeType::Or,
            QueryNode::Not(_) => NodeType::Not,
            QueryNode::Equals(_) => NodeType::Equals,
            QueryNode::NotEquals(_) => NodeType::NotEquals,
            QueryNode::GreaterThan(_) => NodeType::GreaterThan,
            QueryNode::LessThan(_) => NodeType::LessThan,
            QueryNode::GreaterOrEqual(_) => NodeType::GreaterOrEqual,
            QueryNode::LessOrEqual(_) => NodeType::LessOrEqual,
            QueryNode::MatchesRegex(_) => NodeType::MatchesRegex,
            QueryNode::Contains(_) => NodeType::Contains,
            QueryNode::In(_) => NodeType::In,
            QueryNode::NotIn(_) => NodeType::NotIn,
            QueryNode::StartsWith(_) => NodeType::StartsWith,
            QueryNode::EndsWith(_) => NodeType::EndsWith,
        }
    }
}
