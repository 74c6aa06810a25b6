//! Named collections and single-query dispatch
//!
//! Query execution never returns an error: every failure is reported as an
//! unsuccessful `QueryResult`. Invalid query payloads keep their message;
//! anything else is logged and reported as `"Unexpected Error"`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::config::DatabaseConfig;
use super::errors::{DatabaseError, DatabaseResult};
use crate::canonical::{class_name_of, Dict, DictSerializable};
use crate::collection::{Collection, ListenerId};
use crate::observability::{log_event, Event, Logger, MetricsRegistry};
use crate::query::{Query, QueryExecutionResult, QueryResult, TransactionQuery};

pub const UNEXPECTED_ERROR: &str = "Unexpected Error";
pub const MUST_AFFECT_FAILED: &str =
    "No data matched the condition (mustAffectAtLeastOne = true)";

/// In-memory document database.
#[derive(Debug, Default)]
pub struct Database {
    pub(super) collections: BTreeMap<String, Collection>,
    pub(super) config: DatabaseConfig,
    metrics: MetricsRegistry,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database and applies the config's log threshold.
    pub fn with_config(config: DatabaseConfig) -> Self {
        Logger::set_min_severity(config.min_log_severity);
        log_event(
            Event::ConfigLoaded,
            &[
                ("min_log_severity", config.min_log_severity.as_str()),
                ("metrics_enabled", bool_str(config.metrics_enabled)),
            ],
        );
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Returns the named collection, creating it empty if absent.
    pub fn collection(&mut self, name: &str) -> &mut Collection {
        self.collections.entry(name.to_string()).or_default()
    }

    pub fn get_collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Collection names in sorted order
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    /// Number of collections
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// The named collection in dictionary form; an empty map if absent.
    pub fn collection_to_dict(&self, name: &str) -> Dict {
        self.collections
            .get(name)
            .map(|c| c.to_dict())
            .unwrap_or_default()
    }

    /// Replaces the named collection's records from dictionary form,
    /// keeping its listeners. Listeners are not notified.
    pub fn collection_from_dict(&mut self, name: &str, src: &Dict) -> DatabaseResult<()> {
        let imported = Collection::from_dict(src)?;
        let collection = self.collection(name);
        collection.replace_records(imported.into_records());
        let len = collection.len().to_string();
        log_event(Event::DictImported, &[("collection", name), ("records", len.as_str())]);
        Ok(())
    }

    pub fn add_listener(
        &mut self,
        target: &str,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> ListenerId {
        self.collection(target).add_listener(listener)
    }

    /// Returns false if the collection or the listener does not exist.
    pub fn remove_listener(&mut self, target: &str, id: ListenerId) -> bool {
        self.collections
            .get_mut(target)
            .is_some_and(|c| c.remove_listener(id))
    }

    /// Executes one query against its target collection, creating the
    /// collection if absent.
    pub fn execute_query(&mut self, query: &Query) -> QueryResult {
        let collection = self.collections.entry(query.target.clone()).or_default();
        let delivered = collection.notifications_delivered();
        let outcome = collection.execute(query);
        let db_length = collection.len();
        let notified = collection.notifications_delivered() > delivered;

        let result = match outcome {
            Ok(result) => enforce_must_affect(query, result),
            Err(err) if err.is_invalid_query() => {
                QueryResult::errored(query.query_type, db_length, err.to_string())
            }
            Err(err) => {
                log_event(
                    Event::QueryFailed,
                    &[
                        ("target", query.target.as_str()),
                        ("type", query.query_type.name()),
                        ("code", err.code()),
                        ("error", err.to_string().as_str()),
                    ],
                );
                QueryResult::errored(query.query_type, db_length, UNEXPECTED_ERROR)
            }
        };
        self.record_outcome(query, &result, notified);
        result
    }

    /// Executes a `Query` or `TransactionQuery` given in dictionary form.
    pub fn execute_query_object(&mut self, src: &Dict) -> DatabaseResult<QueryExecutionResult> {
        match class_name_of(src) {
            Some(name) if name == Query::CLASS_NAME => {
                let query = Query::from_dict(src)?;
                Ok(self.execute_query(&query).into())
            }
            Some(name) if name == TransactionQuery::CLASS_NAME => {
                let transaction = TransactionQuery::from_dict(src)?;
                Ok(self.execute_transaction_query(&transaction).into())
            }
            other => Err(DatabaseError::UnsupportedClass(
                other.unwrap_or("<missing>").to_string(),
            )),
        }
    }

    pub(super) fn with_metrics(&self, record: impl FnOnce(&MetricsRegistry)) {
        if self.config.metrics_enabled {
            record(&self.metrics);
        }
    }

    fn record_outcome(&self, query: &Query, result: &QueryResult, notified: bool) {
        let fields = [
            ("target", query.target.as_str()),
            ("type", query.query_type.name()),
        ];
        if result.is_success {
            self.with_metrics(MetricsRegistry::increment_queries_executed);
            log_event(Event::QueryExecuted, &fields);
        } else {
            self.with_metrics(MetricsRegistry::increment_queries_failed);
            let message = result.error_message.as_deref().unwrap_or_default();
            log_event(
                Event::QueryRejected,
                &[fields[0], fields[1], ("message", message)],
            );
        }
        if notified {
            self.with_metrics(MetricsRegistry::increment_listener_notifications);
            log_event(Event::ListenersNotified, &[fields[0]]);
        }
    }
}

/// Flips a successful mutation that changed nothing into a failure. The
/// operation's effect is not reverted and `hitCount` is kept.
fn enforce_must_affect(query: &Query, result: QueryResult) -> QueryResult {
    if query.must_affect_at_least_one
        && query.query_type.is_mutation()
        && result.is_success
        && result.update_count == 0
    {
        QueryResult {
            is_success: false,
            result: Vec::new(),
            update_count: 0,
            error_message: Some(MUST_AFFECT_FAILED.to_string()),
            ..result
        }
    } else {
        result
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

impl DictSerializable for Database {
    const CLASS_NAME: &'static str = "DeltaTraceDatabase";
    const VERSION: &'static str = "4";
    type Error = DatabaseError;

    fn to_dict(&self) -> Dict {
        let collections: Dict = self
            .collections
            .iter()
            .map(|(name, c)| (name.clone(), Value::Object(c.to_dict())))
            .collect();
        let mut dict = Dict::new();
        dict.insert("className".into(), Value::from(Self::CLASS_NAME));
        dict.insert("version".into(), Value::from(Self::VERSION));
        dict.insert("collections".into(), Value::Object(collections));
        dict
    }

    fn from_dict(src: &Dict) -> DatabaseResult<Self> {
        let raw = src
            .get("collections")
            .and_then(Value::as_object)
            .ok_or_else(|| DatabaseError::Malformed("'collections' should be a map".into()))?;
        let mut collections = BTreeMap::new();
        for (name, value) in raw {
            let dict = value.as_object().ok_or_else(|| {
                DatabaseError::Malformed(format!("value of collection '{}' is not a map", name))
            })?;
            collections.insert(name.clone(), Collection::from_dict(dict)?);
        }
        Ok(Self {
            collections,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Record;
    use crate::query::{QueryNode, QueryType, SingleSort};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn seeded() -> Database {
        let mut db = Database::new();
        db.execute_query(&Query::add(
            "users",
            vec![
                record(json!({"id": 1, "name": "Alice"})),
                record(json!({"id": 2, "name": "Bob"})),
            ],
        ));
        db
    }

    #[test]
    fn test_query_creates_target_collection() {
        let mut db = Database::new();
        let r = db.execute_query(&Query::count("fresh"));
        assert!(r.is_success);
        assert_eq!(r.hit_count, 0);
        assert_eq!(db.collection_names(), vec!["fresh"]);
    }

    #[test]
    fn test_must_affect_flips_success_without_revert() {
        let mut db = seeded();
        let q = Query::update(
            "users",
            QueryNode::equals("name", json!("Zed")),
            record(json!({"x": 1})),
        )
        .must_affect_at_least_one();
        let r = db.execute_query(&q);
        assert!(!r.is_success);
        assert_eq!(r.update_count, 0);
        assert_eq!(r.error_message.as_deref(), Some(MUST_AFFECT_FAILED));

        let q = Query::update(
            "users",
            QueryNode::equals("name", json!("Bob")),
            record(json!({"x": 1})),
        )
        .must_affect_at_least_one();
        assert!(db.execute_query(&q).is_success);
    }

    #[test]
    fn test_must_affect_ignores_reads() {
        let mut db = Database::new();
        let q = Query::search("users", QueryNode::equals("id", json!(1))).must_affect_at_least_one();
        assert!(db.execute_query(&q).is_success);
    }

    #[test]
    fn test_invalid_payload_message_is_surfaced() {
        let mut db = Database::new();
        let r = db.execute_query(&Query::new("users", QueryType::Search));
        assert!(!r.is_success);
        assert_eq!(r.update_count, -1);
        assert_eq!(
            r.error_message.as_deref(),
            Some("Invalid query: queryNode is required for search")
        );
    }

    #[test]
    fn test_sort_failure_is_unexpected_error() {
        let mut db = seeded();
        db.execute_query(&Query::add("users", vec![record(json!({"id": "three"}))]));
        let r = db.execute_query(&Query::get_all("users").with_sort(SingleSort::asc("id")));
        assert!(!r.is_success);
        assert_eq!(r.error_message.as_deref(), Some(UNEXPECTED_ERROR));
        assert_eq!((r.update_count, r.hit_count), (-1, -1));
        assert_eq!(r.db_length, 3);
    }

    #[test]
    fn test_listeners_through_database() {
        let mut db = seeded();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let id = db.add_listener("users", move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        db.execute_query(&Query::delete("users", QueryNode::equals("id", json!(1))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(db.metrics().snapshot().listener_notifications, 1);

        assert!(db.remove_listener("users", id));
        assert!(!db.remove_listener("missing", id));
        db.execute_query(&Query::clear("users"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_execute_query_object_dispatch() {
        let mut db = seeded();
        let src = Query::count("users").to_dict();
        match db.execute_query_object(&src).unwrap() {
            QueryExecutionResult::Query(r) => assert_eq!(r.hit_count, 2),
            other => panic!("unexpected result: {:?}", other),
        }

        let tx = TransactionQuery::new(vec![Query::clear("users")]).to_dict();
        assert!(matches!(
            db.execute_query_object(&tx).unwrap(),
            QueryExecutionResult::Transaction(_)
        ));

        let err = db
            .execute_query_object(&record(json!({"className": "Collection"})))
            .unwrap_err();
        assert_eq!(err, DatabaseError::UnsupportedClass("Collection".into()));
    }

    #[test]
    fn test_collection_dict_import_keeps_listeners() {
        let mut db = seeded();
        db.add_listener("users", || {});
        let exported = db.collection_to_dict("users");
        db.execute_query(&Query::clear("users"));
        db.collection_from_dict("users", &exported).unwrap();
        let users = db.get_collection("users").unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users.listener_count(), 1);
        assert!(db.collection_to_dict("missing").is_empty());
    }

    #[test]
    fn test_database_dict_round_trip() {
        let db = seeded();
        let d = db.to_dict();
        assert_eq!(d["className"], json!("DeltaTraceDatabase"));
        assert_eq!(d["collections"]["users"]["data"][1]["name"], json!("Bob"));
        let copy = Database::from_dict(&d).unwrap();
        assert_eq!(copy.to_dict(), d);
    }

    #[test]
    fn test_database_from_dict_rejects_bad_shapes() {
        let err = Database::from_dict(&record(json!({"collections": []}))).unwrap_err();
        assert_eq!(err.code(), "DELTA_MALFORMED_DICT");
        let err = Database::from_dict(&record(json!({"collections": {"a": 1}}))).unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_metrics_can_be_disabled() {
        let config = DatabaseConfig {
            metrics_enabled: false,
            ..DatabaseConfig::default()
        };
        let mut db = Database::with_config(config);
        db.execute_query(&Query::count("users"));
        assert_eq!(db.metrics().snapshot().queries_executed, 0);

        let mut db = Database::new();
        db.execute_query(&Query::count("users"));
        assert_eq!(db.metrics().snapshot().queries_executed, 1);
    }
}
