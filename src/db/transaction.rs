//! Transaction coordinator
//!
//! Isolation is whole-collection copy: every collection a transaction
//! names is snapshotted before the first query runs and restored wholesale
//! if any query fails. Listener notifications are held back until commit
//! and then delivered once per collection, in order of first reference.

use super::database::Database;
use crate::collection::CollectionSnapshot;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::query::{TransactionQuery, TransactionQueryResult};

pub const TRANSACTION_FAILED: &str = "Transaction failed";

/// Pre-transaction state of one target collection.
struct Captured {
    name: String,
    snapshot: CollectionSnapshot,
    /// The collection did not exist before the transaction
    created: bool,
}

impl Database {
    /// Executes every query in order, or none of them.
    ///
    /// On failure all touched collections are restored and the result
    /// carries no per-query detail.
    pub fn execute_transaction_query(
        &mut self,
        transaction: &TransactionQuery,
    ) -> TransactionQueryResult {
        let size = transaction.queries.len().to_string();
        log_event(Event::TransactionBegin, &[("queries", size.as_str())]);

        let captured = self.capture(transaction);
        let mut results = Vec::with_capacity(transaction.queries.len());
        for (index, query) in transaction.queries.iter().enumerate() {
            let result = self.execute_query(query);
            if !result.is_success {
                let index = index.to_string();
                log_event(
                    Event::TransactionRollback,
                    &[
                        ("failed_query", index.as_str()),
                        ("target", query.target.as_str()),
                        ("message", result.error_message.as_deref().unwrap_or_default()),
                    ],
                );
                self.rollback(captured);
                return TransactionQueryResult::failed(TRANSACTION_FAILED);
            }
            results.push(result);
        }

        self.commit(captured);
        TransactionQueryResult::committed(results)
    }

    fn capture(&mut self, transaction: &TransactionQuery) -> Vec<Captured> {
        let mut captured = Vec::new();
        for name in transaction.targets() {
            let created = !self.collections.contains_key(name);
            let collection = self.collection(name);
            collection.begin_transaction();
            captured.push(Captured {
                name: name.to_string(),
                snapshot: collection.snapshot(),
                created,
            });
        }
        let count = captured.len();
        self.with_metrics(|m| m.add_snapshots(count as u64));
        log_event(
            Event::SnapshotCaptured,
            &[("collections", count.to_string().as_str())],
        );
        captured
    }

    fn rollback(&mut self, captured: Vec<Captured>) {
        let drop_created = self.config.remove_created_collections_on_rollback;
        for entry in captured {
            if entry.created && drop_created {
                self.collections.remove(&entry.name);
                continue;
            }
            if let Some(collection) = self.collections.get_mut(&entry.name) {
                // Held-back notifications are discarded with the changes
                collection.end_transaction();
                collection.restore(entry.snapshot);
            }
        }
        self.with_metrics(MetricsRegistry::increment_transactions_rolled_back);
        log_event(Event::SnapshotRestored, &[]);
    }

    fn commit(&mut self, captured: Vec<Captured>) {
        let mut notified = 0;
        for entry in &captured {
            if let Some(collection) = self.collections.get_mut(&entry.name) {
                if collection.end_transaction() {
                    let before = collection.notifications_delivered();
                    collection.notify_listeners();
                    if collection.notifications_delivered() > before {
                        notified += 1;
                    }
                }
            }
        }
        self.with_metrics(|m| {
            m.increment_transactions_committed();
            for _ in 0..notified {
                m.increment_listener_notifications();
            }
        });
        log_event(
            Event::TransactionCommit,
            &[("notified_collections", notified.to_string().as_str())],
        );
    }
}
