//! Observability subsystem for deltastore
//!
//! - Structured logging (JSON lines)
//! - Atomic counters
//! - Typed events
//!
//! Observability is read-only: nothing here changes the outcome of a
//! query or transaction.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Only verifies no panic
        log_event(Event::TransactionBegin, &[]);
        log_event(Event::QueryFailed, &[("target", "users")]);
    }
}
