//! Default [`TargetCaller`] issuing one JSON request per target over HTTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fanout_api::TargetClient;
use fanout_registry::FieldConfig;
use fanout_types::Target;
use fanout_util::{HttpExecError, build_path, execute_http_json_request, select_response_path, unresolved_placeholders};
use indexmap::IndexMap;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::dispatch::TargetCaller;
use crate::error::CallError;

/// Calls targets with a shared `reqwest` client.
///
/// The request path is the field's path template with `{name}` placeholders
/// filled from the context arguments. Arguments not consumed by the path
/// become query parameters for GET/DELETE or the JSON body otherwise.
#[derive(Debug, Clone)]
pub struct HttpTargetCaller {
    clients: IndexMap<String, TargetClient>,
    method: Method,
    path: String,
    list_response_path: Option<String>,
}

impl HttpTargetCaller {
    /// Build a caller for every target of a configured field.
    pub fn from_field_config(config: &FieldConfig) -> Result<Self> {
        let http = TargetClient::build_http(&config.headers)?;
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", config.method))?;

        let mut clients = IndexMap::new();
        for target in &config.targets {
            clients.insert(target.name.clone(), TargetClient::new(target, http.clone())?);
        }

        Ok(Self {
            clients,
            method,
            path: config.path.clone(),
            list_response_path: config.list_response_path.clone(),
        })
    }

    fn client_for(&self, target: &Target) -> Result<&TargetClient, CallError> {
        self.clients
            .get(&target.name)
            .ok_or_else(|| CallError::other(&target.name, "no HTTP client configured for target"))
    }

    /// Resolve the request path and the arguments left over for query or body.
    fn prepare_request(&self, target: &Target, arguments: &Map<String, Value>) -> Result<(String, Map<String, Value>), CallError> {
        let path = build_path(&self.path, arguments);
        let missing = unresolved_placeholders(&path);
        if !missing.is_empty() {
            return Err(CallError::other(
                &target.name,
                format!("missing path argument(s): {}", missing.join(", ")),
            ));
        }

        let remaining = arguments
            .iter()
            .filter(|(name, _)| !self.path.contains(&format!("{{{name}}}")))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok((path, remaining))
    }
}

#[async_trait]
impl TargetCaller for HttpTargetCaller {
    async fn call(&self, target: &Target, context: &ExecutionContext) -> Result<Value, CallError> {
        let client = self.client_for(target)?;
        let (path, arguments) = self.prepare_request(target, context.arguments())?;

        let payload = execute_http_json_request(client, self.method.clone(), &path, arguments)
            .await
            .map_err(|error| match error {
                HttpExecError::Network { message } => CallError::network(&target.name, message),
                HttpExecError::Status { status, body_preview } => CallError::status(&target.name, status, body_preview),
                HttpExecError::Decode(parse_error) => CallError::decode(&target.name, parse_error.to_string()),
            })?;

        Ok(select_response_path(payload, self.list_response_path.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_types::DeclaredShape;
    use serde_json::json;

    fn field_config(path: &str) -> FieldConfig {
        FieldConfig {
            shape: DeclaredShape::Collection,
            path: path.to_string(),
            method: "get".to_string(),
            list_response_path: None,
            timeout_ms: None,
            headers: IndexMap::new(),
            targets: vec![Target::new("primary", "https://primary.example.com/")],
            merge: Default::default(),
        }
    }

    #[test]
    fn path_arguments_are_consumed() {
        let caller = HttpTargetCaller::from_field_config(&field_config("/users/{user}/posts")).unwrap();
        let mut arguments = Map::new();
        arguments.insert("user".into(), json!("ada"));
        arguments.insert("limit".into(), json!(10));

        let target = Target::new("primary", "https://primary.example.com");
        let (path, remaining) = caller.prepare_request(&target, &arguments).unwrap();
        assert_eq!(path, "/users/ada/posts");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn missing_path_argument_is_a_call_error() {
        let caller = HttpTargetCaller::from_field_config(&field_config("/users/{user}")).unwrap();
        let target = Target::new("primary", "https://primary.example.com");
        let err = caller.prepare_request(&target, &Map::new()).unwrap_err();
        assert_eq!(err, CallError::other("primary", "missing path argument(s): user"));
    }

    #[test]
    fn unknown_target_has_no_client() {
        let caller = HttpTargetCaller::from_field_config(&field_config("/users")).unwrap();
        let err = caller.client_for(&Target::new("ghost", "https://ghost.example.com")).unwrap_err();
        assert_eq!(err.target(), "ghost");
    }
}
