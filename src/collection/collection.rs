//! Record store
//!
//! A collection owns its records outright. Records handed in are copied on
//! the way in, records handed out are copies, so callers never alias stored
//! state.

use serde_json::Value;

use super::errors::CollectionError;
use super::listeners::{ListenerId, ListenerSet};
use crate::canonical::{records_from, Dict, DictSerializable, Record};
use crate::query::{Query, QueryError, QueryNode, QueryResult, QueryType};

/// An ordered sequence of records plus change listeners.
#[derive(Debug, Default)]
pub struct Collection {
    records: Vec<Record>,
    listeners: ListenerSet,
}

/// Full copy of a collection's records.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    records: Vec<Record>,
}

impl CollectionSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The snapshot in collection dictionary form
    pub fn to_dict(&self) -> Dict {
        collection_dict(&self.records)
    }
}

fn collection_dict(records: &[Record]) -> Dict {
    let mut dict = Dict::new();
    dict.insert("className".into(), Value::from(Collection::CLASS_NAME));
    dict.insert("version".into(), Value::from(Collection::VERSION));
    dict.insert(
        "data".into(),
        Value::Array(records.iter().cloned().map(Value::Object).collect()),
    );
    dict
}

fn predicate(query: &Query) -> Result<&QueryNode, CollectionError> {
    require(&query.query_node, "queryNode", query)
}

fn require<'q, T>(
    value: &'q Option<T>,
    field: &str,
    query: &Query,
) -> Result<&'q T, CollectionError> {
    value
        .as_ref()
        .ok_or_else(|| CollectionError::missing(field, query.query_type.name()))
}

/// A zero limit means no limit.
fn page_limit(limit: Option<usize>) -> usize {
    match limit {
        None | Some(0) => usize::MAX,
        Some(n) => n,
    }
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding the given records
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            listeners: ListenerSet::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copies of every stored record, in storage order
    pub fn records(&self) -> Vec<Record> {
        self.records.clone()
    }

    /// Registers a change callback.
    pub fn add_listener(&mut self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    /// Unregisters a change callback; false if the id is unknown.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of notification batches delivered to listeners
    pub fn notifications_delivered(&self) -> u64 {
        self.listeners.delivered()
    }

    pub fn is_in_transaction(&self) -> bool {
        self.listeners.is_deferred()
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            records: self.records.clone(),
        }
    }

    /// Replaces the records with the snapshot's. Listeners are kept and
    /// not notified.
    pub fn restore(&mut self, snapshot: CollectionSnapshot) {
        self.records = snapshot.records;
    }

    pub(crate) fn replace_records(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    pub(crate) fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Defers notifications until `end_transaction`.
    pub(crate) fn begin_transaction(&mut self) {
        self.listeners.defer();
    }

    /// Leaves transaction mode; returns whether a notification is owed.
    pub(crate) fn end_transaction(&mut self) -> bool {
        self.listeners.resume()
    }

    pub(crate) fn notify_listeners(&mut self) {
        self.listeners.fire();
    }

    fn changed(&mut self) {
        self.listeners.notify();
    }

    /// Runs the operation named by the query's type.
    pub fn execute(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        match query.query_type {
            QueryType::Add => self.add_all(query),
            QueryType::Update => self.update(query, false),
            QueryType::UpdateOne => self.update(query, true),
            QueryType::Delete => self.delete(query),
            QueryType::DeleteOne => self.delete_one(query),
            QueryType::Search => self.search(query),
            QueryType::GetAll => self.get_all(query),
            QueryType::ConformToTemplate => self.conform_to_template(query),
            QueryType::RenameField => self.rename_field(query),
            QueryType::Count => Ok(self.count(query)),
            QueryType::Clear => Ok(self.clear(query)),
            QueryType::ClearAdd => self.clear_add(query),
        }
    }

    pub fn add_all(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        let incoming = require(&query.add_data, "addData", query)?;
        let added = incoming.len();
        self.records.extend(incoming.iter().cloned());
        if added > 0 {
            self.changed();
        }
        let returned = if query.return_data {
            incoming.clone()
        } else {
            Vec::new()
        };
        Ok(QueryResult::success(
            query.query_type,
            returned,
            self.len(),
            added,
            0,
        ))
    }

    /// Merges the override fields into matching records, in storage order.
    /// With `single` set, stops after the first match.
    pub fn update(&mut self, query: &Query, single: bool) -> Result<QueryResult, CollectionError> {
        let node = predicate(query)?;
        let overrides = require(&query.override_data, "overrideData", query)?;

        let mut matched = Vec::new();
        for (index, record) in self.records.iter_mut().enumerate() {
            if node.evaluate(record) {
                record.extend(overrides.clone());
                matched.push(index);
                if single {
                    break;
                }
            }
        }
        let count = matched.len();

        let mut returned: Vec<Record> = if query.return_data {
            matched.iter().map(|&i| self.records[i].clone()).collect()
        } else {
            Vec::new()
        };
        // Listeners hear about the change only once the sort succeeded
        if let Some(sort) = &query.sort {
            sort.sort(&mut returned)?;
        }
        if count > 0 {
            self.changed();
        }
        Ok(QueryResult::success(
            query.query_type,
            returned,
            self.len(),
            count,
            count,
        ))
    }

    pub fn delete(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        let node = predicate(query)?;
        let (removed, kept): (Vec<Record>, Vec<Record>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| node.evaluate(r));
        self.records = kept;
        Ok(self.removed(query, removed))
    }

    pub fn delete_one(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        let node = predicate(query)?;
        let removed = match self.records.iter().position(|r| node.evaluate(r)) {
            Some(index) => vec![self.records.remove(index)],
            None => Vec::new(),
        };
        Ok(self.removed(query, removed))
    }

    fn removed(&mut self, query: &Query, removed: Vec<Record>) -> QueryResult {
        let count = removed.len();
        if count > 0 {
            self.changed();
        }
        let returned = if query.return_data { removed } else { Vec::new() };
        QueryResult::success(query.query_type, returned, self.len(), count, count)
    }

    /// Filters, then sorts, then applies offset and limit. `hitCount` is
    /// the match count before paging. A zero limit returns every match.
    pub fn search(&self, query: &Query) -> Result<QueryResult, CollectionError> {
        let node = predicate(query)?;
        let mut hits: Vec<&Record> = self.records.iter().filter(|r| node.evaluate(r)).collect();
        let hit_count = hits.len();
        if let Some(sort) = &query.sort {
            sort.sort(&mut hits)?;
        }
        let page = hits
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(page_limit(query.limit))
            .cloned()
            .collect();
        Ok(QueryResult::success(
            query.query_type,
            page,
            self.len(),
            0,
            hit_count,
        ))
    }

    pub fn get_all(&self, query: &Query) -> Result<QueryResult, CollectionError> {
        let mut all = self.records.clone();
        if let Some(sort) = &query.sort {
            sort.sort(&mut all)?;
        }
        let len = all.len();
        Ok(QueryResult::success(query.query_type, all, len, 0, len))
    }

    /// Drops keys the template lacks and fills in keys the record lacks
    /// with the template's values. Existing values are kept.
    pub fn conform_to_template(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        let template = require(&query.template, "template", query)?;
        for record in &mut self.records {
            let extra: Vec<String> = record
                .keys()
                .filter(|k| !template.contains_key(k.as_str()))
                .cloned()
                .collect();
            for key in extra {
                record.remove(&key);
            }
            for (key, value) in template {
                record
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        self.changed();

        let len = self.len();
        let returned = if query.return_data {
            self.records.clone()
        } else {
            Vec::new()
        };
        Ok(QueryResult::success(query.query_type, returned, len, len, len))
    }

    /// Renames a key on every record, or on none: every record is checked
    /// before any is changed.
    pub fn rename_field(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        let before = require(&query.rename_before, "renameBefore", query)?;
        let after = require(&query.rename_after, "renameAfter", query)?;

        for record in &self.records {
            if !record.contains_key(before.as_str()) {
                return Ok(QueryResult::rejected(
                    query.query_type,
                    self.len(),
                    format!("The target key does not exist. key:{}", before),
                ));
            }
            if record.contains_key(after.as_str()) {
                return Ok(QueryResult::rejected(
                    query.query_type,
                    self.len(),
                    format!("An existing key was specified as the new key. key:{}", after),
                ));
            }
        }

        for record in &mut self.records {
            if let Some(value) = record.remove(before.as_str()) {
                record.insert(after.clone(), value);
            }
        }
        let count = self.len();
        if count > 0 {
            self.changed();
        }
        let returned = if query.return_data {
            self.records.clone()
        } else {
            Vec::new()
        };
        Ok(QueryResult::success(
            query.query_type,
            returned,
            count,
            count,
            count,
        ))
    }

    pub fn count(&self, query: &Query) -> QueryResult {
        QueryResult::success(query.query_type, Vec::new(), self.len(), 0, self.len())
    }

    pub fn clear(&mut self, query: &Query) -> QueryResult {
        let prior = self.len();
        self.records.clear();
        if prior > 0 {
            self.changed();
        }
        QueryResult::success(query.query_type, Vec::new(), 0, prior, prior)
    }

    /// Empties the collection and inserts the supplied records as one
    /// change. `updateCount` is the number of records removed.
    pub fn clear_add(&mut self, query: &Query) -> Result<QueryResult, CollectionError> {
        let incoming = require(&query.add_data, "addData", query)?;
        let prior = self.len();
        self.records = incoming.clone();
        if prior > 0 || !incoming.is_empty() {
            self.changed();
        }
        let returned = if query.return_data {
            incoming.clone()
        } else {
            Vec::new()
        };
        Ok(QueryResult::success(
            query.query_type,
            returned,
            self.len(),
            prior,
            prior,
        ))
    }
}

impl DictSerializable for Collection {
    const CLASS_NAME: &'static str = "Collection";
    const VERSION: &'static str = "6";
    type Error = CollectionError;

    fn to_dict(&self) -> Dict {
        collection_dict(&self.records)
    }

    /// A missing `data` field reads as an empty collection.
    fn from_dict(src: &Dict) -> Result<Self, CollectionError> {
        let records = match src.get("data") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => records_from(items, Self::CLASS_NAME, "data")?,
            Some(_) => {
                return Err(QueryError::InvalidField {
                    context: Self::CLASS_NAME,
                    field: "data",
                    expected: "array",
                }
                .into())
            }
        };
        Ok(Self::from_records(records))
    }
}
