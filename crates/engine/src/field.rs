//! One multi-source field: selector in, reconciled value out.

use std::time::Instant;

use fanout_types::{DeclaredShape, MergePolicy, Selector};
use serde_json::Value;
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::dispatch::{TargetCaller, dispatch};
use crate::error::{FanoutError, FieldError};
use crate::merge::merge;
use crate::registry::TargetRegistry;
use crate::validate::{check_declared_shape, validate};

/// Binds a field's targets, declared shape and merge policy.
///
/// Immutable after construction and cheap to clone; concurrent resolutions
/// share the registry.
#[derive(Debug, Clone)]
pub struct FieldSource {
    name: String,
    registry: TargetRegistry,
    shape: DeclaredShape,
    policy: MergePolicy,
}

impl FieldSource {
    pub fn new(name: impl Into<String>, registry: TargetRegistry, shape: DeclaredShape, policy: MergePolicy) -> Self {
        Self {
            name: name.into(),
            registry,
            shape,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn shape(&self) -> DeclaredShape {
        self.shape
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Resolve the field from its raw selector argument.
    ///
    /// `argument` is the runtime value of the source-selection argument:
    /// missing or `null`, a target name, or a list of target names.
    pub async fn resolve<C>(&self, argument: Option<&Value>, context: &ExecutionContext, caller: &C) -> Result<Value, FieldError>
    where
        C: TargetCaller + ?Sized,
    {
        let selector = Selector::from_argument(argument).map_err(|error| FieldError::from_fanout(&self.name, error.into()))?;
        self.resolve_selector(&selector, context, caller).await
    }

    /// Resolve the field for an already parsed selector.
    pub async fn resolve_selector<C>(&self, selector: &Selector, context: &ExecutionContext, caller: &C) -> Result<Value, FieldError>
    where
        C: TargetCaller + ?Sized,
    {
        self.run(selector, context, caller)
            .await
            .map_err(|error| FieldError::from_fanout(&self.name, error))
    }

    async fn run<C>(&self, selector: &Selector, context: &ExecutionContext, caller: &C) -> Result<Value, FanoutError>
    where
        C: TargetCaller + ?Sized,
    {
        let targets = self.registry.resolve(selector)?;
        let mut payloads = dispatch(&targets, context, caller).await?;

        if payloads.len() == 1 {
            debug!(field = %self.name, target_name = %targets[0].name, "single-target resolution");
            return Ok(payloads.pop().unwrap_or(Value::Null));
        }

        let started = Instant::now();
        let payloads = validate(payloads)?;
        check_declared_shape(&payloads, self.shape)?;
        let merged = merge(&payloads, self.shape, &self.policy);
        info!(
            field = %self.name,
            target_count = targets.len(),
            shape = %self.shape,
            merge_ms = started.elapsed().as_millis(),
            "field merge completed"
        );
        Ok(merged)
    }
}
