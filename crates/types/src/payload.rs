//! Classified upstream payloads.

use std::fmt;

use serde_json::{Map, Value};

/// Top-level kind of a payload, used for compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Absent,
    Collection,
    Single,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Absent => write!(f, "absent"),
            PayloadKind::Collection => write!(f, "collection"),
            PayloadKind::Single => write!(f, "single"),
        }
    }
}

/// The value one target returned, classified once so merges never inspect
/// raw JSON types again.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Absent,
    Collection(Vec<Value>),
    Composite(Map<String, Value>),
    Scalar(Value),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Absent => PayloadKind::Absent,
            Payload::Collection(_) => PayloadKind::Collection,
            Payload::Composite(_) | Payload::Scalar(_) => PayloadKind::Single,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Payload::Absent)
    }

    pub fn into_value(self) -> Value {
        match self {
            Payload::Absent => Value::Null,
            Payload::Collection(items) => Value::Array(items),
            Payload::Composite(record) => Value::Object(record),
            Payload::Scalar(value) => value,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Absent,
            Value::Array(items) => Payload::Collection(items),
            Value::Object(record) => Payload::Composite(record),
            scalar => Payload::Scalar(scalar),
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        payload.into_value()
    }
}
