//! Configuration validation for multi-source fields.
//!
//! Everything that can be checked without issuing a request is checked here,
//! once, when the configuration is loaded. Resolution and merge code rely on
//! these guarantees.

use std::collections::HashSet;

use fanout_types::MergePolicy;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{FanoutConfig, FieldConfig};

static FIELD_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("field name regex should compile"));
static TARGET_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("target name regex should compile"));

const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Validate the entire configuration.
pub fn validate_config(config: &FanoutConfig) -> Result<(), ValidationError> {
    for (name, field) in &config.fields {
        validate_field_name(name)?;
        validate_field(name, field)?;
        debug!(field = %name, target_count = field.targets.len(), "validated field configuration");
    }
    Ok(())
}

/// Validate a GraphQL field name.
pub fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if !FIELD_NAME_REGEX.is_match(name) {
        return Err(ValidationError::InvalidFieldName {
            name: name.to_string(),
            reason: "Field names must start with a letter or underscore, followed by letters, digits, or underscores".to_string(),
        });
    }
    Ok(())
}

/// Validate a target name.
pub fn validate_target_name(name: &str) -> Result<(), ValidationError> {
    if !TARGET_NAME_REGEX.is_match(name) {
        return Err(ValidationError::InvalidTargetName {
            name: name.to_string(),
            reason: "Target names must contain only letters, numbers, dots, underscores, and hyphens".to_string(),
        });
    }
    Ok(())
}

/// Validate a single field configuration.
pub fn validate_field(field_name: &str, field: &FieldConfig) -> Result<(), ValidationError> {
    if field.targets.is_empty() {
        return Err(ValidationError::NoTargets {
            field: field_name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for target in &field.targets {
        validate_target_name(&target.name)?;
        if !seen.insert(target.name.as_str()) {
            return Err(ValidationError::DuplicateTarget {
                field: field_name.to_string(),
                name: target.name.clone(),
            });
        }
        validate_address(&target.name, &target.address)?;
    }

    if !SUPPORTED_METHODS.contains(&field.method.to_ascii_uppercase().as_str()) {
        return Err(ValidationError::UnsupportedMethod {
            field: field_name.to_string(),
            method: field.method.clone(),
        });
    }

    if !field.path.is_empty() && !field.path.starts_with('/') {
        return Err(ValidationError::InvalidPath {
            field: field_name.to_string(),
            path: field.path.clone(),
        });
    }

    if field.timeout_ms == Some(0) {
        return Err(ValidationError::InvalidTimeout {
            field: field_name.to_string(),
        });
    }

    for header in field.headers.keys() {
        validate_header_name(header)?;
    }

    validate_merge_policy(field_name, &field.merge)
}

fn validate_address(target: &str, address: &str) -> Result<(), ValidationError> {
    let url = Url::parse(address).map_err(|error| ValidationError::InvalidAddress {
        target: target.to_string(),
        reason: error.to_string(),
    })?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ValidationError::InvalidAddress {
            target: target.to_string(),
            reason: format!("Unsupported URL scheme: {} (expected http/https)", scheme),
        });
    }

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidAddress {
            target: target.to_string(),
            reason: "address must include a host".to_string(),
        });
    }

    Ok(())
}

fn validate_merge_policy(field_name: &str, policy: &MergePolicy) -> Result<(), ValidationError> {
    let key = policy.dedupe_key.as_str();
    if key.trim().is_empty() || key.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidDedupeKey {
            field: field_name.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Validate an HTTP header name.
fn validate_header_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::InvalidHeaderName {
            name: name.to_string(),
            reason: "Header name cannot be empty".to_string(),
        });
    }

    if name.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ValidationError::InvalidHeaderName {
            name: name.to_string(),
            reason: "Header name cannot contain whitespace or control characters".to_string(),
        });
    }

    Ok(())
}

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field name '{name}': {reason}")]
    InvalidFieldName { name: String, reason: String },

    #[error("Invalid target name '{name}': {reason}")]
    InvalidTargetName { name: String, reason: String },

    #[error("Field '{field}' must configure at least one target")]
    NoTargets { field: String },

    #[error("Field '{field}' declares target '{name}' more than once")]
    DuplicateTarget { field: String, name: String },

    #[error("Invalid address for target '{target}': {reason}")]
    InvalidAddress { target: String, reason: String },

    #[error("Field '{field}' uses unsupported HTTP method '{method}'")]
    UnsupportedMethod { field: String, method: String },

    #[error("Field '{field}' path '{path}' must start with '/'")]
    InvalidPath { field: String, path: String },

    #[error("Field '{field}' timeoutMs must be greater than zero")]
    InvalidTimeout { field: String },

    #[error("Field '{field}' dedupe key '{key}' must be a non-empty name without whitespace")]
    InvalidDedupeKey { field: String, key: String },

    #[error("Invalid HTTP header name '{name}': {reason}")]
    InvalidHeaderName { name: String, reason: String },
}
