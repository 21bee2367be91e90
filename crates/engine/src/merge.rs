//! Type-directed reconciliation of validated payloads.
//!
//! - Collections are concatenated in target order and deduplicated by the
//!   policy's dedupe key. A duplicate keeps the position of its first
//!   occurrence; its value is the latest occurrence when `prefer_latest`.
//! - Composite records are deep-merged left to right. Nested arrays are
//!   appended without dedupe, nested records recurse, leaves follow
//!   `prefer_latest`.
//! - Scalars: the first non-absent payload wins.
//!
//! Merging never fails and never mutates its input; callers validate first.

use std::collections::HashMap;

use fanout_types::{DeclaredShape, DedupeKeyKind, MergePolicy, Payload};
use serde_json::{Map, Value};
use tracing::debug;

/// Merge payloads into one value matching `shape`.
///
/// A single payload is returned verbatim. When every payload is absent the
/// result is `null`.
pub fn merge(payloads: &[Payload], shape: DeclaredShape, policy: &MergePolicy) -> Value {
    if let [only] = payloads {
        return only.clone().into_value();
    }
    if payloads.iter().all(Payload::is_absent) {
        return Value::Null;
    }

    match shape {
        DeclaredShape::Collection => merge_collections(payloads, policy),
        DeclaredShape::Composite => merge_composites(payloads, policy),
        DeclaredShape::Scalar => merge_scalars(payloads),
    }
}

/// Identity of a collection element for dedupe purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupeIdentity {
    Text(String),
    Number(String),
    Boolean(bool),
}

fn dedupe_identity(item: &Value, policy: &MergePolicy) -> Option<DedupeIdentity> {
    let key = item.as_object()?.get(&policy.dedupe_key)?;
    match (policy.dedupe_key_kind, key) {
        (_, Value::Null) => None,
        (DedupeKeyKind::String | DedupeKeyKind::Any, Value::String(text)) => Some(DedupeIdentity::Text(text.clone())),
        (DedupeKeyKind::Number | DedupeKeyKind::Any, Value::Number(number)) => {
            Some(DedupeIdentity::Number(number.to_string()))
        }
        (DedupeKeyKind::Any, Value::Bool(flag)) => Some(DedupeIdentity::Boolean(*flag)),
        // Object and array keys have no stable identity; such elements are kept.
        _ => None,
    }
}

fn merge_collections(payloads: &[Payload], policy: &MergePolicy) -> Value {
    let mut merged: Vec<Value> = Vec::new();
    let mut positions: HashMap<DedupeIdentity, usize> = HashMap::new();
    let mut seen = 0usize;

    for items in payloads.iter().filter_map(|payload| match payload {
        Payload::Collection(items) => Some(items),
        _ => None,
    }) {
        seen += items.len();
        for item in items {
            let Some(identity) = dedupe_identity(item, policy) else {
                merged.push(item.clone());
                continue;
            };
            match positions.get(&identity) {
                Some(&position) => {
                    if policy.prefer_latest {
                        merged[position] = item.clone();
                    }
                }
                None => {
                    positions.insert(identity, merged.len());
                    merged.push(item.clone());
                }
            }
        }
    }

    debug!(
        input_items = seen,
        merged_items = merged.len(),
        dedupe_key = %policy.dedupe_key,
        "collection merge completed"
    );
    Value::Array(merged)
}

fn merge_composites(payloads: &[Payload], policy: &MergePolicy) -> Value {
    let mut accumulator = Map::new();
    let mut folded = 0usize;
    for record in payloads.iter().filter_map(|payload| match payload {
        Payload::Composite(record) => Some(record),
        _ => None,
    }) {
        merge_record_into(&mut accumulator, record, policy);
        folded += 1;
    }
    if folded == 0 {
        return Value::Null;
    }
    Value::Object(accumulator)
}

fn merge_record_into(accumulator: &mut Map<String, Value>, incoming: &Map<String, Value>, policy: &MergePolicy) {
    for (key, value) in incoming {
        match (accumulator.get_mut(key), value) {
            (_, Value::Null) => {}
            (Some(Value::Array(existing)), Value::Array(items)) => existing.extend(items.iter().cloned()),
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_record_into(existing, nested, policy),
            (_, Value::Array(_) | Value::Object(_)) => {
                accumulator.insert(key.clone(), value.clone());
            }
            (Some(_), _) if !policy.prefer_latest => {}
            (_, leaf) => {
                accumulator.insert(key.clone(), leaf.clone());
            }
        }
    }
}

fn merge_scalars(payloads: &[Payload]) -> Value {
    payloads
        .iter()
        .find(|payload| !payload.is_absent())
        .map(|payload| payload.clone().into_value())
        .unwrap_or(Value::Null)
}
