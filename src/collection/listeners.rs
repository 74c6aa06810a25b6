//! Change listeners
//!
//! Callbacks run synchronously on the caller's thread. While deferred,
//! a notification only marks the set as pending.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token returned when a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change callback
pub type Listener = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: Vec<(ListenerId, Listener)>,
    deferred: bool,
    pending: bool,
    delivered: u64,
}

impl ListenerSet {
    pub fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if the id was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Invokes every listener, or marks the set pending while deferred.
    pub fn notify(&mut self) {
        if self.deferred {
            self.pending = true;
        } else {
            self.fire();
        }
    }

    /// Invokes every listener in registration order.
    pub fn fire(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for (_, listener) in &self.listeners {
            listener();
        }
        self.delivered += 1;
    }

    pub fn defer(&mut self) {
        self.deferred = true;
        self.pending = false;
    }

    /// Leaves deferred mode; returns whether a notification was held back.
    pub fn resume(&mut self) -> bool {
        self.deferred = false;
        std::mem::take(&mut self.pending)
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Number of non-empty notification batches delivered so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .field("deferred", &self.deferred)
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_notify_invokes_all() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = ListenerSet::default();
        set.add(counting(&calls));
        set.add(counting(&calls));
        set.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(set.delivered(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = ListenerSet::default();
        let id = set.add(counting(&calls));
        assert!(set.remove(id));
        assert!(!set.remove(id));
        set.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deferred_notification_is_held() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = ListenerSet::default();
        set.add(counting(&calls));

        set.defer();
        set.notify();
        set.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(set.resume());
        assert!(!set.is_deferred());
        assert!(!set.resume());
    }

    #[test]
    fn test_resume_without_changes_reports_nothing() {
        let mut set = ListenerSet::default();
        set.defer();
        assert!(!set.resume());
    }
}
