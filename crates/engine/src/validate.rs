//! Compatibility checks over the payloads of one dispatch.

use fanout_types::{DeclaredShape, Payload, PayloadKind, json_type_name};
use serde_json::Value;

use crate::error::{IncompatibilityError, ShapeMismatchError};

/// Classify raw payloads and ensure every non-absent one shares the same kind.
pub fn validate(values: Vec<Value>) -> Result<Vec<Payload>, IncompatibilityError> {
    let payloads: Vec<Payload> = values.into_iter().map(Payload::from).collect();
    check_compatible(&payloads)?;
    Ok(payloads)
}

/// Returns the shared kind of the non-absent payloads, or `None` when every
/// payload is absent.
///
/// The first non-absent payload sets the expected kind; the first payload
/// disagreeing with it is reported by index.
pub fn check_compatible(payloads: &[Payload]) -> Result<Option<PayloadKind>, IncompatibilityError> {
    let mut expected = None;
    for (index, payload) in payloads.iter().enumerate() {
        let observed = payload.kind();
        if observed == PayloadKind::Absent {
            continue;
        }
        match expected {
            None => expected = Some(observed),
            Some(kind) if kind == observed => {}
            Some(kind) => {
                return Err(IncompatibilityError {
                    expected: kind,
                    index,
                    observed,
                });
            }
        }
    }
    Ok(expected)
}

/// Ensure the runtime payloads fit the field's declared output type.
///
/// Collection fields accept collections, composite fields accept records and
/// scalar fields accept scalars. Absent payloads fit every shape.
pub fn check_declared_shape(payloads: &[Payload], declared: DeclaredShape) -> Result<(), ShapeMismatchError> {
    let fits = |payload: &Payload| match (declared, payload) {
        (_, Payload::Absent) => true,
        (DeclaredShape::Collection, Payload::Collection(_)) => true,
        (DeclaredShape::Composite, Payload::Composite(_)) => true,
        (DeclaredShape::Scalar, Payload::Scalar(_)) => true,
        _ => false,
    };
    match payloads.iter().enumerate().find(|(_, payload)| !fits(payload)) {
        Some((index, payload)) => Err(ShapeMismatchError {
            declared,
            index,
            observed: payload.kind(),
            found: payload_type_name(payload),
        }),
        None => Ok(()),
    }
}

fn payload_type_name(payload: &Payload) -> &'static str {
    match payload {
        Payload::Absent => "null",
        Payload::Collection(_) => "array",
        Payload::Composite(_) => "object",
        Payload::Scalar(value) => json_type_name(value),
    }
}
