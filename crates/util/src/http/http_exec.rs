//! HTTP execution helpers shared by the fan-out engine and the CLI.
//!
//! This module centralizes one JSON request against one target: query or
//! body encoding of arguments, status interpretation, and strict response
//! decoding.

use std::time::Instant;

use fanout_api::TargetClient;
use reqwest::Method;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::{JsonParseError, parse_response_json_strict, truncate_response_preview};

/// Failure of a single upstream request.
#[derive(Debug, Error)]
pub enum HttpExecError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("upstream returned HTTP {status}: {body_preview}")]
    Status { status: u16, body_preview: String },

    #[error(transparent)]
    Decode(#[from] JsonParseError),
}

impl HttpExecError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn status(status: u16, body_preview: impl Into<String>) -> Self {
        Self::Status {
            status,
            body_preview: body_preview.into(),
        }
    }
}

/// Execute a JSON-backed HTTP request and parse the response payload.
///
/// # Arguments
/// - `client`: Target-bound HTTP client.
/// - `method`: HTTP method to execute.
/// - `request_path`: Path for the request, already resolved with any path variables.
/// - `arguments`: Query parameters for GET/DELETE requests, or the JSON body for other methods.
///
/// # Returns
/// Returns the parsed JSON payload for a successful response, `Value::Null` for empty bodies,
/// or an error if the HTTP request, status, or JSON parsing fails.
pub async fn execute_http_json_request(
    client: &TargetClient,
    method: Method,
    request_path: &str,
    arguments: Map<String, Value>,
) -> Result<Value, HttpExecError> {
    let start = Instant::now();
    debug!(
        target_name = %client.target_name,
        method = %method,
        path = %request_path,
        argument_count = arguments.len(),
        "http request started"
    );
    let mut request_builder = client.request(method.clone(), request_path);

    match method {
        Method::GET | Method::DELETE => {
            if !arguments.is_empty() {
                let query_pairs = build_query_pairs(arguments);
                request_builder = request_builder.query(&query_pairs);
            }
        }
        _ => {
            request_builder = request_builder.json(&Value::Object(arguments));
        }
    }

    let response = request_builder
        .send()
        .await
        .map_err(|error| HttpExecError::network(crate::redact_sensitive(&error.to_string())))?;
    let status = response.status();
    let body_text = response
        .text()
        .await
        .map_err(|error| HttpExecError::network(format!("failed to read response body: {error}")))?;

    if !status.is_success() {
        let body_preview = crate::redact_sensitive(&truncate_response_preview(&body_text, 200));
        warn!(
            target_name = %client.target_name,
            method = %method,
            path = %request_path,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request failed"
        );
        return Err(HttpExecError::status(status.as_u16(), body_preview));
    }

    if body_text.trim().is_empty() {
        debug!(
            target_name = %client.target_name,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request completed with empty response"
        );
        return Ok(Value::Null);
    }

    let parsed = parse_response_json_strict(&body_text, Some(status)).inspect_err(|error| {
        warn!(
            target_name = %client.target_name,
            path = %request_path,
            status = %status,
            body_len = body_text.len(),
            error = %error,
            "http response JSON parse failed"
        );
    })?;
    debug!(
        target_name = %client.target_name,
        method = %method,
        path = %request_path,
        status = %status,
        duration_ms = start.elapsed().as_millis(),
        "http request completed"
    );
    Ok(parsed)
}

/// Select the value at a dotted `path` inside a response envelope.
///
/// `"."` or an empty path returns the payload itself. A path that does not
/// resolve yields `Value::Null`, which the engine treats as an absent payload.
pub fn select_response_path(payload: Value, path: Option<&str>) -> Value {
    let Some(path) = path.map(str::trim).filter(|path| !path.is_empty() && *path != ".") else {
        return payload;
    };

    let mut current = payload;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(mut map) => map.remove(segment).unwrap_or(Value::Null),
            Value::Array(mut items) => match segment.parse::<usize>() {
                Ok(index) if index < items.len() => items.swap_remove(index),
                _ => Value::Null,
            },
            _ => Value::Null,
        };
    }
    current
}

fn build_query_pairs(query_parameters: Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query_parameters {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), query_value_to_string(item)));
                }
            }
            Value::Null => {}
            other => pairs.push((key, query_value_to_string(other))),
        }
    }
    pairs
}

fn query_value_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
