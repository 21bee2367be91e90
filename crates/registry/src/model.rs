//! Data models for field source configuration.

use std::time::Duration;

use fanout_types::{DeclaredShape, MergePolicy, Target};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration containing every multi-source field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    /// Map of GraphQL field names to their source configuration, in document order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
}

impl FanoutConfig {
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }
}

/// Configuration for a single multi-source field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldConfig {
    /// Declared output shape of the field.
    #[serde(default)]
    pub shape: DeclaredShape,

    /// Request path appended to each target address; `{name}` placeholders
    /// are filled from field arguments.
    #[serde(default = "default_path")]
    pub path: String,

    /// HTTP method used for every target.
    #[serde(default = "default_method")]
    pub method: String,

    /// Dotted path selecting the payload inside a response envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_response_path: Option<String>,

    /// Deadline for the whole fan-out, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Static headers sent to every target.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    /// Upstream targets; the first entry is the default.
    pub targets: Vec<Target>,

    #[serde(default)]
    pub merge: MergePolicy,
}

impl FieldConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|target| target.name.as_str()).collect()
    }
}

fn default_path() -> String {
    "/".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] crate::validation::ValidationError),
}
