//! Every configured multi-source field, ready to resolve over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use fanout_registry::FanoutConfig;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::FieldError;
use crate::field::FieldSource;
use crate::http::HttpTargetCaller;
use crate::registry::TargetRegistry;

#[derive(Debug, Clone)]
struct CatalogEntry {
    source: FieldSource,
    caller: HttpTargetCaller,
    timeout: Option<Duration>,
}

/// Field sources and their HTTP callers, keyed by field name in
/// configuration order.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl FieldCatalog {
    /// Build a source and caller for every field in `config`.
    pub fn from_config(config: &FanoutConfig) -> Result<Self> {
        let mut entries = IndexMap::new();
        for (name, field) in &config.fields {
            let registry = TargetRegistry::new(field.targets.iter().cloned()).with_context(|| format!("field '{name}'"))?;
            let caller = HttpTargetCaller::from_field_config(field).with_context(|| format!("field '{name}'"))?;
            let source = FieldSource::new(name.clone(), registry, field.shape, field.merge.clone());
            entries.insert(
                name.clone(),
                CatalogEntry {
                    source,
                    caller,
                    timeout: field.timeout(),
                },
            );
        }
        info!(field_count = entries.len(), "field catalog built");
        Ok(Self { entries })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn source(&self, field: &str) -> Option<&FieldSource> {
        self.entries.get(field).map(|entry| &entry.source)
    }

    /// Resolve `field` with its configured HTTP caller.
    ///
    /// The field's configured timeout applies when `context` carries no
    /// deadline of its own.
    pub async fn resolve(&self, field: &str, argument: Option<&Value>, context: &ExecutionContext) -> Result<Value, FieldError> {
        let entry = self.entries.get(field).ok_or_else(|| FieldError::NotConfigured {
            field: field.to_string(),
        })?;

        match (context.deadline(), entry.timeout) {
            (None, Some(timeout)) => {
                let bounded = context.clone().with_timeout(timeout);
                entry.source.resolve(argument, &bounded, &entry.caller).await
            }
            _ => entry.source.resolve(argument, context, &entry.caller).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_registry::{ConfigFormat, parse_config_str};

    const CONFIG: &str = r#"
fields:
  users:
    shape: collection
    path: /users
    timeoutMs: 250
    merge:
      dedupeKey: uuid
      preferLatest: false
    targets:
      - name: primary
        address: http://127.0.0.1:9
  today:
    targets:
      - name: clock
        address: http://127.0.0.1:9
"#;

    #[test]
    fn builds_one_source_per_field_in_order() {
        let config = parse_config_str(CONFIG, ConfigFormat::Yaml).unwrap();
        let catalog = FieldCatalog::from_config(&config).unwrap();
        assert_eq!(catalog.field_names().collect::<Vec<_>>(), vec!["users", "today"]);
        assert_eq!(catalog.source("today").unwrap().shape(), fanout_types::DeclaredShape::Scalar);
        let users = catalog.source("users").unwrap();
        assert_eq!(users.registry().names().collect::<Vec<_>>(), vec!["primary"]);
        assert_eq!(users.policy().dedupe_key, "uuid");
        assert!(!users.policy().prefer_latest);
    }

    #[tokio::test]
    async fn unknown_field_is_not_configured() {
        let catalog = FieldCatalog::default();
        let err = catalog.resolve("missing", None, &ExecutionContext::new()).await.unwrap_err();
        assert_eq!(
            err,
            FieldError::NotConfigured {
                field: "missing".to_string()
            }
        );
    }
}
