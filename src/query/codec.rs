//! Dictionary codec for query nodes
//!
//! Nodes serialize to `{type, version, ...fields}`. Decoding dispatches on
//! `type` through a static table covering every variant; unknown tags are
//! rejected.

use serde_json::Value;

use super::ast::{Comparison, FieldAffix, FieldValue, Membership, NodeType, QueryNode, RegexMatch};
use super::compare::{Operand, ValueType};
use super::errors::QueryError;
use super::timestamp::Timestamp;
use crate::canonical::{required, required_array, required_object, required_str, Dict};

const LOGICAL_VERSION: &str = "1";
const COMPARISON_VERSION: &str = "2";
const MATCH_VERSION: &str = "1";

impl QueryNode {
    /// Converts the node (and its children) into dictionary form.
    pub fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        dict.insert("type".into(), Value::from(self.node_type().name()));
        let version = match self {
            QueryNode::And(children) | QueryNode::Or(children) => {
                let conditions = children.iter().map(|c| Value::Object(c.to_dict()));
                dict.insert("conditions".into(), Value::Array(conditions.collect()));
                LOGICAL_VERSION
            }
            QueryNode::Not(child) => {
                dict.insert("condition".into(), Value::Object(child.to_dict()));
                LOGICAL_VERSION
            }
            QueryNode::Equals(c)
            | QueryNode::NotEquals(c)
            | QueryNode::GreaterThan(c)
            | QueryNode::LessThan(c)
            | QueryNode::GreaterOrEqual(c)
            | QueryNode::LessOrEqual(c) => {
                dict.insert("field".into(), Value::from(c.field.as_str()));
                dict.insert("value".into(), c.value.to_value().into_owned());
                dict.insert("vType".into(), Value::from(c.value_type.name()));
                COMPARISON_VERSION
            }
            QueryNode::MatchesRegex(m) => {
                dict.insert("field".into(), Value::from(m.field.as_str()));
                dict.insert("pattern".into(), Value::from(m.pattern.as_str()));
                MATCH_VERSION
            }
            QueryNode::Contains(fv) => {
                dict.insert("field".into(), Value::from(fv.field.as_str()));
                dict.insert("value".into(), fv.value.clone());
                MATCH_VERSION
            }
            QueryNode::In(m) | QueryNode::NotIn(m) => {
                dict.insert("field".into(), Value::from(m.field.as_str()));
                dict.insert("values".into(), Value::Array(m.values.clone()));
                MATCH_VERSION
            }
            QueryNode::StartsWith(a) | QueryNode::EndsWith(a) => {
                dict.insert("field".into(), Value::from(a.field.as_str()));
                dict.insert("value".into(), Value::from(a.affix.as_str()));
                MATCH_VERSION
            }
        };
        dict.insert("version".into(), Value::from(version));
        dict
    }

    /// Restores a node from dictionary form.
    pub fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        let node_type = NodeType::from_name(required_str(src, "QueryNode", "type")?)?;
        let ctx = node_type.name();
        let node = match node_type {
            NodeType::And => QueryNode::And(children(src, ctx)?),
            NodeType::Or => QueryNode::Or(children(src, ctx)?),
            NodeType::Not => {
                let child = required_object(src, ctx, "condition")?;
                QueryNode::Not(Box::new(QueryNode::from_dict(child)?))
            }
            NodeType::Equals => QueryNode::Equals(comparison(src, ctx)?),
            NodeType::NotEquals => QueryNode::NotEquals(comparison(src, ctx)?),
            NodeType::GreaterThan => QueryNode::GreaterThan(comparison(src, ctx)?),
            NodeType::LessThan => QueryNode::LessThan(comparison(src, ctx)?),
            NodeType::GreaterOrEqual => QueryNode::GreaterOrEqual(comparison(src, ctx)?),
            NodeType::LessOrEqual => QueryNode::LessOrEqual(comparison(src, ctx)?),
            NodeType::MatchesRegex => QueryNode::MatchesRegex(RegexMatch::new(
                required_str(src, ctx, "field")?,
                required_str(src, ctx, "pattern")?,
            )),
            NodeType::Contains => QueryNode::Contains(FieldValue {
                field: required_str(src, ctx, "field")?.to_string(),
                value: required(src, ctx, "value")?.clone(),
            }),
            NodeType::In => QueryNode::In(membership(src, ctx)?),
            NodeType::NotIn => QueryNode::NotIn(membership(src, ctx)?),
            NodeType::StartsWith => QueryNode::StartsWith(affix(src, ctx)?),
            NodeType::EndsWith => QueryNode::EndsWith(affix(src, ctx)?),
        };
        Ok(node)
    }
}

fn children(src: &Dict, ctx: &'static str) -> Result<Vec<QueryNode>, QueryError> {
    required_array(src, ctx, "conditions")?
        .iter()
        .map(|c| {
            let child = c.as_object().ok_or(QueryError::InvalidField {
                context: ctx,
                field: "conditions",
                expected: "array of objects",
            })?;
            QueryNode::from_dict(child)
        })
        .collect()
}

/// A missing `vType` reads as `auto_`. String literals tagged `datetime_`
/// are restored as timestamps; anything unparsable stays a plain literal
/// and keeps evaluating to false.
fn comparison(src: &Dict, ctx: &'static str) -> Result<Comparison, QueryError> {
    let field = required_str(src, ctx, "field")?;
    let raw = required(src, ctx, "value")?;
    let value_type = match src.get("vType") {
        Some(Value::String(name)) => ValueType::from_name(name)?,
        Some(_) => {
            return Err(QueryError::InvalidField {
                context: ctx,
                field: "vType",
                expected: "string",
            })
        }
        None => ValueType::Auto,
    };
    let value = match (value_type, raw) {
        (ValueType::Datetime, Value::String(s)) => match Timestamp::parse(s) {
            Some(ts) => Operand::Timestamp(ts),
            None => Operand::Value(raw.clone()),
        },
        _ => Operand::Value(raw.clone()),
    };
    Ok(Comparison::new(field, value, value_type))
}

fn membership(src: &Dict, ctx: &'static str) -> Result<Membership, QueryError> {
    Ok(Membership {
        field: required_str(src, ctx, "field")?.to_string(),
        values: required_array(src, ctx, "values")?.clone(),
    })
}

fn affix(src: &Dict, ctx: &'static str) -> Result<FieldAffix, QueryError> {
    Ok(FieldAffix {
        field: required_str(src, ctx, "field")?.to_string(),
        affix: required_str(src, ctx, "value")?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dict(v: Value) -> Dict {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_comparison_dict_shape() {
        let node = QueryNode::equals("age", json!(30)).with_value_type(ValueType::Int);
        let d = node.to_dict();
        assert_eq!(d["type"], json!("equals_"));
        assert_eq!(d["field"], json!("age"));
        assert_eq!(d["value"], json!(30));
        assert_eq!(d["vType"], json!("int_"));
        assert_eq!(d["version"], json!("2"));
    }

    #[test]
    fn test_logical_dict_nests_children() {
        let node = QueryNode::not(QueryNode::or(vec![QueryNode::starts_with("n", "A")]));
        let d = node.to_dict();
        assert_eq!(d["type"], json!("not_"));
        assert_eq!(d["condition"]["type"], json!("or_"));
        assert_eq!(d["condition"]["conditions"][0]["value"], json!("A"));
        assert!(d["condition"]["conditions"][0].get("vType").is_none());
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let node = QueryNode::and(vec![
            QueryNode::greater_than("score", json!(1.5)).with_value_type(ValueType::FloatEpsilon),
            QueryNode::matches_regex("name", "^A"),
            QueryNode::not_in("tag", vec![json!("x"), Value::Null]),
            QueryNode::contains("tags", json!({"k": 1})),
            QueryNode::ends_with("mail", ".org"),
        ]);
        assert_eq!(QueryNode::from_dict(&node.to_dict()).unwrap(), node);
    }

    #[test]
    fn test_timestamp_literal_round_trip() {
        let ts = Timestamp::parse("2024-02-29T23:59:59+05:30").unwrap();
        let node = QueryNode::less_or_equal("at", ts);
        let d = node.to_dict();
        assert_eq!(d["vType"], json!("datetime_"));
        assert_eq!(d["value"], json!("2024-02-29T23:59:59+05:30"));
        assert_eq!(QueryNode::from_dict(&d).unwrap(), node);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = QueryNode::from_dict(&dict(json!({"type": "xor_", "version": "1"})))
            .unwrap_err();
        assert_eq!(err, QueryError::UnknownNodeType("xor_".into()));
    }

    #[test]
    fn test_unknown_child_type_is_rejected() {
        let src = dict(json!({
            "type": "and_",
            "conditions": [{"type": "bogus_"}],
            "version": "1"
        }));
        assert!(QueryNode::from_dict(&src).is_err());
    }

    #[test]
    fn test_missing_vtype_defaults_to_auto_and_extra_fields_ignored() {
        let src = dict(json!({
            "type": "lessThan_",
            "field": "n",
            "value": 3,
            "version": "2",
            "comment": "ignored"
        }));
        let node = QueryNode::from_dict(&src).unwrap();
        assert_eq!(node, QueryNode::less_than("n", json!(3)));
    }
}
