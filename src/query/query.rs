//! Query and transaction query definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ast::QueryNode;
use super::errors::QueryError;
use super::sorter::SingleSort;
use crate::canonical::{records_from, required_str, Dict, DictSerializable, Record};

/// Operation kind of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryType {
    Add,
    Update,
    UpdateOne,
    Delete,
    DeleteOne,
    Search,
    GetAll,
    ConformToTemplate,
    RenameField,
    Count,
    Clear,
    ClearAdd,
}

impl QueryType {
    /// Wire name used in the `type` field
    pub fn name(&self) -> &'static str {
        match self {
            QueryType::Add => "add",
            QueryType::Update => "update",
            QueryType::UpdateOne => "updateOne",
            QueryType::Delete => "delete",
            QueryType::DeleteOne => "deleteOne",
            QueryType::Search => "search",
            QueryType::GetAll => "getAll",
            QueryType::ConformToTemplate => "conformToTemplate",
            QueryType::RenameField => "renameField",
            QueryType::Count => "count",
            QueryType::Clear => "clear",
            QueryType::ClearAdd => "clearAdd",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, QueryError> {
        match name {
            "add" => Ok(QueryType::Add),
            "update" => Ok(QueryType::Update),
            "updateOne" => Ok(QueryType::UpdateOne),
            "delete" => Ok(QueryType::Delete),
            "deleteOne" => Ok(QueryType::DeleteOne),
            "search" => Ok(QueryType::Search),
            "getAll" => Ok(QueryType::GetAll),
            "conformToTemplate" => Ok(QueryType::ConformToTemplate),
            "renameField" => Ok(QueryType::RenameField),
            "count" => Ok(QueryType::Count),
            "clear" => Ok(QueryType::Clear),
            "clearAdd" => Ok(QueryType::ClearAdd),
            other => Err(QueryError::UnknownQueryType(other.to_string())),
        }
    }

    /// Returns true for operations that may change stored records
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            QueryType::Search | QueryType::GetAll | QueryType::Count
        )
    }
}

/// A single operation against one named collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Target collection name
    pub target: String,
    /// Operation kind
    pub query_type: QueryType,
    /// Predicate for update/delete/search
    pub query_node: Option<QueryNode>,
    /// Records for add/clearAdd
    pub add_data: Option<Vec<Record>>,
    /// Fields merged by update/updateOne
    pub override_data: Option<Record>,
    /// Shape applied by conformToTemplate
    pub template: Option<Record>,
    /// Optional ordering of returned records
    pub sort: Option<SingleSort>,
    /// Search results to skip
    pub offset: Option<usize>,
    /// Maximum search results returned
    pub limit: Option<usize>,
    /// Source key for renameField
    pub rename_before: Option<String>,
    /// Destination key for renameField
    pub rename_after: Option<String>,
    /// Return affected records from mutations
    pub return_data: bool,
    /// Report failure when a mutation changes nothing
    pub must_affect_at_least_one: bool,
}

impl Query {
    /// Creates an empty query of the given kind
    pub fn new(target: impl Into<String>, query_type: QueryType) -> Self {
        Self {
            target: target.into(),
            query_type,
            query_node: None,
            add_data: None,
            override_data: None,
            template: None,
            sort: None,
            offset: None,
            limit: None,
            rename_before: None,
            rename_after: None,
            return_data: false,
            must_affect_at_least_one: false,
        }
    }

    pub fn add(target: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            add_data: Some(records),
            ..Self::new(target, QueryType::Add)
        }
    }

    pub fn update(target: impl Into<String>, node: QueryNode, overrides: Record) -> Self {
        Self {
            query_node: Some(node),
            override_data: Some(overrides),
            ..Self::new(target, QueryType::Update)
        }
    }

    pub fn update_one(target: impl Into<String>, node: QueryNode, overrides: Record) -> Self {
        Self {
            query_type: QueryType::UpdateOne,
            ..Self::update(target, node, overrides)
        }
    }

    pub fn delete(target: impl Into<String>, node: QueryNode) -> Self {
        Self {
            query_node: Some(node),
            ..Self::new(target, QueryType::Delete)
        }
    }

    pub fn delete_one(target: impl Into<String>, node: QueryNode) -> Self {
        Self {
            query_node: Some(node),
            ..Self::new(target, QueryType::DeleteOne)
        }
    }

    pub fn search(target: impl Into<String>, node: QueryNode) -> Self {
        Self {
            query_node: Some(node),
            ..Self::new(target, QueryType::Search)
        }
    }

    pub fn get_all(target: impl Into<String>) -> Self {
        Self::new(target, QueryType::GetAll)
    }

    pub fn conform_to_template(target: impl Into<String>, template: Record) -> Self {
        Self {
            template: Some(template),
            ..Self::new(target, QueryType::ConformToTemplate)
        }
    }

    pub fn rename_field(
        target: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            rename_before: Some(before.into()),
            rename_after: Some(after.into()),
            ..Self::new(target, QueryType::RenameField)
        }
    }

    pub fn count(target: impl Into<String>) -> Self {
        Self::new(target, QueryType::Count)
    }

    pub fn clear(target: impl Into<String>) -> Self {
        Self::new(target, QueryType::Clear)
    }

    pub fn clear_add(target: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            add_data: Some(records),
            ..Self::new(target, QueryType::ClearAdd)
        }
    }

    pub fn with_sort(mut self, sort: SingleSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn returning_data(mut self) -> Self {
        self.return_data = true;
        self
    }

    pub fn must_affect_at_least_one(mut self) -> Self {
        self.must_affect_at_least_one = true;
        self
    }
}

fn optional_record(src: &Dict, field: &'static str) -> Result<Option<Record>, QueryError> {
    match src.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(QueryError::InvalidField {
            context: Query::CLASS_NAME,
            field,
            expected: "object",
        }),
    }
}

fn optional_string(src: &Dict, field: &'static str) -> Result<Option<String>, QueryError> {
    match src.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(QueryError::InvalidField {
            context: Query::CLASS_NAME,
            field,
            expected: "string",
        }),
    }
}

fn optional_usize(src: &Dict, field: &'static str) -> Result<Option<usize>, QueryError> {
    match src.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or(QueryError::InvalidField {
                context: Query::CLASS_NAME,
                field,
                expected: "non-negative integer",
            }),
    }
}

fn flag(src: &Dict, field: &str) -> bool {
    src.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn opt_value<T>(value: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    value.map(f).unwrap_or(Value::Null)
}

impl DictSerializable for Query {
    const CLASS_NAME: &'static str = "Query";
    const VERSION: &'static str = "1";
    type Error = QueryError;

    fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        dict.insert("className".into(), Value::from(Self::CLASS_NAME));
        dict.insert("version".into(), Value::from(Self::VERSION));
        dict.insert("target".into(), Value::from(self.target.as_str()));
        dict.insert("type".into(), Value::from(self.query_type.name()));
        dict.insert(
            "queryNode".into(),
            opt_value(self.query_node.as_ref(), |n| Value::Object(n.to_dict())),
        );
        dict.insert(
            "addData".into(),
            opt_value(self.add_data.as_ref(), |rs| {
                Value::Array(rs.iter().cloned().map(Value::Object).collect())
            }),
        );
        dict.insert(
            "overrideData".into(),
            opt_value(self.override_data.clone(), Value::Object),
        );
        dict.insert("template".into(), opt_value(self.template.clone(), Value::Object));
        dict.insert(
            "sortObj".into(),
            opt_value(self.sort.as_ref(), |s| Value::Object(s.to_dict())),
        );
        dict.insert("offset".into(), opt_value(self.offset, Value::from));
        dict.insert("limit".into(), opt_value(self.limit, Value::from));
        dict.insert(
            "renameBefore".into(),
            opt_value(self.rename_before.clone(), Value::String),
        );
        dict.insert(
            "renameAfter".into(),
            opt_value(self.rename_after.clone(), Value::String),
        );
        dict.insert("returnData".into(), Value::Bool(self.return_data));
        dict.insert(
            "mustAffectAtLeastOne".into(),
            Value::Bool(self.must_affect_at_least_one),
        );
        dict
    }

    fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        let target = required_str(src, Self::CLASS_NAME, "target")?;
        let query_type = QueryType::from_name(required_str(src, Self::CLASS_NAME, "type")?)?;
        let query_node = match src.get("queryNode") {
            None | Some(Value::Null) => None,
            Some(Value::Object(node)) => Some(QueryNode::from_dict(node)?),
            Some(_) => {
                return Err(QueryError::InvalidField {
                    context: Self::CLASS_NAME,
                    field: "queryNode",
                    expected: "object",
                })
            }
        };
        let add_data = match src.get("addData") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(records_from(items, Self::CLASS_NAME, "addData")?),
            Some(_) => {
                return Err(QueryError::InvalidField {
                    context: Self::CLASS_NAME,
                    field: "addData",
                    expected: "array",
                })
            }
        };
        let sort = optional_record(src, "sortObj")?
            .map(|s| SingleSort::from_dict(&s))
            .transpose()?;

        Ok(Self {
            target: target.to_string(),
            query_type,
            query_node,
            add_data,
            override_data: optional_record(src, "overrideData")?,
            template: optional_record(src, "template")?,
            sort,
            offset: optional_usize(src, "offset")?,
            limit: optional_usize(src, "limit")?,
            rename_before: optional_string(src, "renameBefore")?,
            rename_after: optional_string(src, "renameAfter")?,
            return_data: flag(src, "returnData"),
            must_affect_at_least_one: flag(src, "mustAffectAtLeastOne"),
        })
    }
}

/// Ordered queries executed as one all-or-nothing unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionQuery {
    pub queries: Vec<Query>,
}

impl TransactionQuery {
    pub fn new(queries: Vec<Query>) -> Self {
        Self { queries }
    }

    /// Distinct target collections in order of first reference
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for q in &self.queries {
            if !targets.contains(&q.target.as_str()) {
                targets.push(&q.target);
            }
        }
        targets
    }
}

impl DictSerializable for TransactionQuery {
    const CLASS_NAME: &'static str = "TransactionQuery";
    const VERSION: &'static str = "1";
    type Error = QueryError;

    fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        dict.insert("className".into(), Value::from(Self::CLASS_NAME));
        dict.insert("version".into(), Value::from(Self::VERSION));
        dict.insert(
            "queries".into(),
            Value::Array(
                self.queries
                    .iter()
                    .map(|q| Value::Object(q.to_dict()))
                    .collect(),
            ),
        );
        dict
    }

    fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        let items = crate::canonical::required_array(src, Self::CLASS_NAME, "queries")?;
        let queries = items
            .iter()
            .map(|item| {
                let q = item.as_object().ok_or(QueryError::InvalidField {
                    context: Self::CLASS_NAME,
                    field: "queries",
                    expected: "array of objects",
                })?;
                Query::from_dict(q)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_query_type_names() {
        assert_eq!(QueryType::from_name("clearAdd"), Ok(QueryType::ClearAdd));
        assert_eq!(QueryType::UpdateOne.name(), "updateOne");
        assert!(QueryType::from_name("upsert").is_err());
        assert_eq!(
            serde_json::to_value(QueryType::ConformToTemplate).unwrap(),
            json!("conformToTemplate")
        );
    }

    #[test]
    fn test_mutation_classification() {
        assert!(QueryType::Add.is_mutation());
        assert!(QueryType::RenameField.is_mutation());
        assert!(!QueryType::Search.is_mutation());
        assert!(!QueryType::Count.is_mutation());
    }

    #[test]
    fn test_builder() {
        let q = Query::search("users", QueryNode::equals("active", json!(true)))
            .with_sort(SingleSort::desc("age"))
            .with_offset(5)
            .with_limit(10);
        assert_eq!(q.query_type, QueryType::Search);
        assert_eq!(q.offset, Some(5));
        assert_eq!(q.limit, Some(10));
        assert!(!q.must_affect_at_least_one);
    }

    #[test]
    fn test_query_dict_round_trip() {
        let q = Query::update(
            "users",
            QueryNode::greater_than("age", json!(18)),
            record(json!({"adult": true})),
        )
        .with_sort(SingleSort::asc("name"))
        .returning_data()
        .must_affect_at_least_one();
        let d = q.to_dict();
        assert_eq!(d["className"], json!("Query"));
        assert_eq!(d["type"], json!("update"));
        assert_eq!(Query::from_dict(&d).unwrap(), q);
    }

    #[test]
    fn test_transaction_targets_in_first_reference_order() {
        let tq = TransactionQuery::new(vec![
            Query::count("b"),
            Query::count("a"),
            Query::clear("b"),
        ]);
        assert_eq!(tq.targets(), vec!["b", "a"]);
    }

    #[test]
    fn test_transaction_dict_round_trip() {
        let tq = TransactionQuery::new(vec![
            Query::add("users", vec![record(json!({"id": 1}))]),
            Query::rename_field("users", "id", "uid"),
        ]);
        let restored = TransactionQuery::from_dict(&tq.to_dict()).unwrap();
        assert_eq!(restored, tq);
    }

    #[test]
    fn test_from_dict_rejects_bad_types() {
        let src = record(json!({"target": "users", "type": "search", "limit": -1}));
        assert!(Query::from_dict(&src).is_err());
        let src = record(json!({"target": "users", "type": "merge"}));
        assert_eq!(
            Query::from_dict(&src).unwrap_err(),
            QueryError::UnknownQueryType("merge".into())
        );
    }
}
