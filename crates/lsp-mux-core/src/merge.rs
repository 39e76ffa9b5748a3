//! Capability merge algorithm.
//!
//! Folds partial initialize results from several feature servers into a single
//! document. Values are visited in registration order and merged field by field:
//!
//! - **Objects** merge recursively, key by key.
//! - **Lists** are combined with a running accumulator: the incoming list is
//!   prepended, then duplicates are removed keeping the first occurrence. Items
//!   unique to a later server therefore surface ahead of earlier ones, while a
//!   repeated item keeps its earliest-seen position.
//! - **Everything else** (booleans, numbers, strings, or mismatched types) keeps
//!   the earliest defined value. `null` is treated as "not defined".
//!
//! # Examples
//!
//! ```
//! use lsp_mux_core::merge::fold;
//! use serde_json::json;
//!
//! let merged = fold(
//!     json!({}),
//!     [
//!         json!({"sections": ["log"]}),
//!         json!({"sections": ["log", "test"]}),
//!         json!({"sections": ["test"]}),
//!     ],
//! );
//! assert_eq!(merged, json!({"sections": ["test", "log"]}));
//! ```

use serde_json::Value;

/// Merges `incoming` into `acc`, where `acc` holds values from earlier servers.
pub fn merge_into(acc: &mut Value, incoming: Value) {
    match (acc, incoming) {
        (_, Value::Null) => {}
        (acc @ Value::Null, incoming) => *acc = incoming,
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        if !value.is_null() {
                            target.insert(key, value);
                        }
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            let previous = std::mem::take(target);
            *target = prepend_unique(source, previous);
        }
        // Scalar-like: the earliest definition wins.
        _ => {}
    }
}

/// Prepends `head` to `tail` and drops repeated items, keeping first occurrences.
pub fn prepend_unique(head: Vec<Value>, tail: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(head.len() + tail.len());
    for item in head.into_iter().chain(tail) {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

/// Folds `parts` into `base` in order.
///
/// `base` takes precedence over every part for scalar-like fields, which is how
/// the router's default fragment (server identity, text sync) stays authoritative.
pub fn fold<I>(base: Value, parts: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    parts.into_iter().fold(base, |mut acc, part| {
        merge_into(&mut acc, part);
        acc
    })
}
