//! Shared type definitions for multi-source field resolution.
//!
//! These types are plain data: targets configured for a field, the runtime
//! selector choosing among them, the declared output shape of the field, and
//! the merge policy applied when several targets answer the same request.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod payload;

pub use payload::{Payload, PayloadKind};

/// A named upstream data source configured for a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Unique name within the field's target set (e.g. "primary")
    pub name: String,
    /// Base address requests are issued against (e.g. "https://api.example.com")
    pub address: String,
}

impl Target {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Runtime argument choosing which target(s) serve one field resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// No selection; the first configured target is used.
    #[default]
    Absent,
    /// Exactly one named target.
    One(String),
    /// An ordered list of named targets; duplicates are kept.
    Many(Vec<String>),
}

impl Selector {
    /// Interpret a GraphQL argument value as a selector.
    ///
    /// `null` is absent, a string names one target, and an array of strings
    /// names several. An empty array behaves like an absent selector.
    pub fn from_argument(argument: Option<&Value>) -> Result<Self, SelectorError> {
        match argument {
            None | Some(Value::Null) => Ok(Self::Absent),
            Some(Value::String(name)) => Ok(Self::One(name.clone())),
            Some(Value::Array(items)) => {
                let mut names = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::String(name) => names.push(name.clone()),
                        other => {
                            return Err(SelectorError::InvalidListEntry {
                                index,
                                found: json_type_name(other),
                            });
                        }
                    }
                }
                if names.is_empty() {
                    return Ok(Self::Absent);
                }
                Ok(Self::Many(names))
            }
            Some(other) => Err(SelectorError::InvalidArgument {
                found: json_type_name(other),
            }),
        }
    }
}

/// Error returned when a runtime argument cannot be read as a selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("source selector must be a target name or a list of target names; got {found}")]
    InvalidArgument { found: &'static str },

    #[error("source selector entry {index} must be a target name; got {found}")]
    InvalidListEntry { index: usize, found: &'static str },
}

/// Static output shape of a field, taken from its declared GraphQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredShape {
    /// List of records, merged by concatenation and dedupe.
    Collection,
    /// Object type, merged by recursive deep-merge.
    Composite,
    /// Scalar or enum, first answer wins.
    #[default]
    Scalar,
}

impl fmt::Display for DeclaredShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredShape::Collection => write!(f, "collection"),
            DeclaredShape::Composite => write!(f, "composite"),
            DeclaredShape::Scalar => write!(f, "scalar"),
        }
    }
}

impl FromStr for DeclaredShape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collection" | "list" => Ok(Self::Collection),
            "composite" | "object" => Ok(Self::Composite),
            "scalar" => Ok(Self::Scalar),
            _ => Err(ParseShapeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid shape '{0}'; expected 'collection', 'composite' or 'scalar'")]
pub struct ParseShapeError(String);

/// Expected JSON type of the dedupe key inside collection elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeKeyKind {
    /// Any string, number or boolean; "1" and 1 differ. Object and array
    /// keys are never deduplicated.
    #[default]
    Any,
    String,
    Number,
}

impl fmt::Display for DedupeKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupeKeyKind::Any => write!(f, "any"),
            DedupeKeyKind::String => write!(f, "string"),
            DedupeKeyKind::Number => write!(f, "number"),
        }
    }
}

/// Reconciliation settings shared by every merge performed for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct MergePolicy {
    /// Record field identifying "the same item" across targets.
    pub dedupe_key: String,
    pub dedupe_key_kind: DedupeKeyKind,
    /// When true, values from later targets replace earlier ones.
    pub prefer_latest: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            dedupe_key: "id".to_string(),
            dedupe_key_kind: DedupeKeyKind::Any,
            prefer_latest: true,
        }
    }
}

impl MergePolicy {
    pub fn with_dedupe_key(mut self, dedupe_key: impl Into<String>) -> Self {
        self.dedupe_key = dedupe_key.into();
        self
    }

    pub fn with_dedupe_key_kind(mut self, kind: DedupeKeyKind) -> Self {
        self.dedupe_key_kind = kind;
        self
    }

    pub fn with_prefer_latest(mut self, prefer_latest: bool) -> Self {
        self.prefer_latest = prefer_latest;
        self
    }
}

/// Human-readable JSON type name used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
