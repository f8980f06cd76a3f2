//! Decides whether a computed result is worth persisting

use serde::Serialize;
use serde_json::Value;

/// Predicate deciding whether a producer result may be cached
pub type CacheablePredicate<V> = std::sync::Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Returns true if the JSON value carries at least one meaningful field
///
/// Nulls, empty strings, empty collections and objects whose fields are all
/// themselves meaningless are treated as empty.
pub fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => fields.values().any(is_meaningful),
    }
}

/// Default predicate: the serialized result is non-empty
pub fn non_empty<V: Serialize>(value: &V) -> bool {
    serde_json::to_value(value)
        .map(|v| is_meaningful(&v))
        .unwrap_or(false)
}
