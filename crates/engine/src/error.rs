//! Error types for field resolution.
//!
//! Every failure the engine detects is surfaced immediately and atomically:
//! a resolution either produces one merged value or exactly one of these
//! errors. Nothing here is retried.

use fanout_types::{DeclaredShape, PayloadKind, SelectorError};
use thiserror::Error;

/// Failure of one call to one target, produced by a [`crate::TargetCaller`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("target '{target}' network error: {message}")]
    Network { target: String, message: String },

    #[error("target '{target}' returned HTTP {status}: {body_preview}")]
    Status { target: String, status: u16, body_preview: String },

    #[error("target '{target}' returned an invalid response: {message}")]
    Decode { target: String, message: String },

    #[error("target '{target}' call failed: {message}")]
    Other { target: String, message: String },
}

impl CallError {
    pub fn network(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn status(target: impl Into<String>, status: u16, body_preview: impl Into<String>) -> Self {
        Self::Status {
            target: target.into(),
            status,
            body_preview: body_preview.into(),
        }
    }

    pub fn decode(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn other(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Name of the target whose call failed.
    pub fn target(&self) -> &str {
        match self {
            Self::Network { target, .. } | Self::Status { target, .. } | Self::Decode { target, .. } | Self::Other { target, .. } => target,
        }
    }
}

/// A selector named a target that is not configured for the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target '{name}'; valid targets: {}", .valid.join(", "))]
pub struct UnknownTargetError {
    pub name: String,
    pub valid: Vec<String>,
}

/// Payloads returned by different targets disagree on their top-level kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("incompatible payloads: expected {expected} (from the first non-absent payload) but payload {index} is {observed}")]
pub struct IncompatibilityError {
    pub expected: PayloadKind,
    pub index: usize,
    pub observed: PayloadKind,
}

/// Payloads agree with each other but not with the field's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payload {index} has JSON type {found} but the field is declared as {declared}")]
pub struct ShapeMismatchError {
    pub declared: DeclaredShape,
    pub index: usize,
    pub observed: PayloadKind,
    /// JSON type of the offending payload.
    pub found: &'static str,
}

/// One call of a multi-target dispatch failed; the whole dispatch is aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fan-out to {total} targets aborted by '{target}': {source}")]
pub struct DispatchError {
    pub target: String,
    pub index: usize,
    pub total: usize,
    #[source]
    pub source: CallError,
}

/// Errors that can occur while building a target registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("at least one target must be configured")]
    Empty,

    #[error("target '{name}' is configured more than once")]
    DuplicateTarget { name: String },
}

/// Any failure of the resolve, dispatch, validate and merge pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FanoutError {
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    #[error(transparent)]
    UnknownTarget(#[from] UnknownTargetError),

    /// Single-target failure, passed through without wrapping.
    #[error(transparent)]
    Call(CallError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Incompatible(#[from] IncompatibilityError),

    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),

    #[error("timed out after {elapsed_ms}ms waiting for {targets} target(s)")]
    Timeout { elapsed_ms: u64, targets: usize },

    #[error("cancelled while waiting for {targets} target(s)")]
    Cancelled { targets: usize },
}

/// Error reported to the query layer for one field resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The single selected target failed; reported exactly as the caller produced it.
    #[error(transparent)]
    Call(CallError),

    #[error("field '{field}': {source}")]
    Fanout {
        field: String,
        #[source]
        source: FanoutError,
    },

    #[error("field '{field}' has no configured sources")]
    NotConfigured { field: String },
}

impl FieldError {
    pub(crate) fn from_fanout(field: &str, error: FanoutError) -> Self {
        match error {
            FanoutError::Call(call_error) => Self::Call(call_error),
            source => Self::Fanout {
                field: field.to_string(),
                source,
            },
        }
    }

    /// The underlying pipeline error, when there is one.
    pub fn fanout(&self) -> Option<&FanoutError> {
        match self {
            Self::Fanout { source, .. } => Some(source),
            _ => None,
        }
    }
}
