//! Collection subsystem for deltastore
//!
//! A collection is an ordered, exclusively owned sequence of records with
//! change listeners. Scans are linear; there are no indexes.
//!
//! Listeners fire synchronously after an operation that changed at least
//! one record. Inside a transaction the notification is held back and
//! delivered once by the database after commit.

#[allow(clippy::module_inception)]
mod collection;
mod errors;
mod listeners;

pub use collection::{Collection, CollectionSnapshot};
pub use errors::CollectionError;
pub use listeners::{Listener, ListenerId};
