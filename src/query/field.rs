//! Dotted field path resolution

use serde_json::Value;

use crate::canonical::Record;

/// Resolves a dot-separated path (`"address.city"`) into nested maps.
///
/// Returns `None` when any segment is missing or an intermediate value is
/// not a map. Never fails.
pub fn resolve_field<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Like [`resolve_field`], but folds an explicit `null` into "absent".
pub(crate) fn resolve_present<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    resolve_field(record, path).filter(|v| !v.is_null())
}
