//! Concurrent dispatch of one call per selected target.
//!
//! A single target is called directly. Several targets are called
//! concurrently and joined all-or-nothing: the first failure aborts the
//! dispatch and drops every call still in flight. One deadline and one
//! cancellation token from the [`ExecutionContext`] govern the dispatch as a
//! whole.

use std::future::pending;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fanout_types::Target;
use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::ExecutionContext;
use crate::error::{CallError, DispatchError, FanoutError};

/// Performs one upstream call for one target.
///
/// Implementations own request construction, the network transaction,
/// status interpretation and decoding. Errors must name the target.
#[async_trait]
pub trait TargetCaller: Send + Sync {
    async fn call(&self, target: &Target, context: &ExecutionContext) -> Result<Value, CallError>;
}

#[async_trait]
impl<T: TargetCaller + ?Sized> TargetCaller for Arc<T> {
    async fn call(&self, target: &Target, context: &ExecutionContext) -> Result<Value, CallError> {
        (**self).call(target, context).await
    }
}

/// Adapts an async closure into a [`TargetCaller`].
pub struct FnCaller<F>(F);

/// Wrap `call` so it can be used wherever a [`TargetCaller`] is expected.
pub fn caller_fn<F, Fut>(call: F) -> FnCaller<F>
where
    F: Fn(Target, ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CallError>> + Send,
{
    FnCaller(call)
}

#[async_trait]
impl<F, Fut> TargetCaller for FnCaller<F>
where
    F: Fn(Target, ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CallError>> + Send,
{
    async fn call(&self, target: &Target, context: &ExecutionContext) -> Result<Value, CallError> {
        (self.0)(target.clone(), context.clone()).await
    }
}

/// Call every target and return their payloads in target order.
///
/// # Errors
/// - [`FanoutError::Call`] when the only target fails (unwrapped)
/// - [`FanoutError::Dispatch`] when any call of a multi-target dispatch fails
/// - [`FanoutError::Timeout`] when the context deadline elapses first
/// - [`FanoutError::Cancelled`] when the context is cancelled first
pub async fn dispatch<C>(targets: &[Target], context: &ExecutionContext, caller: &C) -> Result<Vec<Value>, FanoutError>
where
    C: TargetCaller + ?Sized,
{
    match targets {
        [] => Ok(Vec::new()),
        [target] => {
            let payload = bounded(context, 1, caller.call(target, context)).await?;
            payload.map(|value| vec![value]).map_err(FanoutError::Call)
        }
        _ => dispatch_many(targets, context, caller).await,
    }
}

async fn dispatch_many<C>(targets: &[Target], context: &ExecutionContext, caller: &C) -> Result<Vec<Value>, FanoutError>
where
    C: TargetCaller + ?Sized,
{
    let total = targets.len();
    let started = Instant::now();
    info!(target_count = total, "fan-out dispatch started");

    let calls = targets.iter().enumerate().map(|(index, target)| async move {
        let call_started = Instant::now();
        match caller.call(target, context).await {
            Ok(payload) => {
                debug!(
                    target_name = %target.name,
                    index,
                    duration_ms = call_started.elapsed().as_millis(),
                    "fan-out call completed"
                );
                Ok(payload)
            }
            Err(source) => {
                warn!(
                    target_name = %target.name,
                    index,
                    duration_ms = call_started.elapsed().as_millis(),
                    error = %source,
                    "fan-out call failed"
                );
                Err(DispatchError {
                    target: target.name.clone(),
                    index,
                    total,
                    source,
                })
            }
        }
    });

    let payloads = bounded(context, total, try_join_all(calls)).await??;
    info!(
        target_count = total,
        duration_ms = started.elapsed().as_millis(),
        "fan-out dispatch completed"
    );
    Ok(payloads)
}

/// Drive `work` until it finishes, the deadline passes, or the context is
/// cancelled. Losing the race drops `work`, abandoning its in-flight calls.
async fn bounded<F>(context: &ExecutionContext, targets: usize, work: F) -> Result<F::Output, FanoutError>
where
    F: Future,
{
    let started = Instant::now();
    let deadline = async {
        match context.deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = context.cancellation().cancelled() => {
            warn!(targets, "dispatch cancelled");
            Err(FanoutError::Cancelled { targets })
        }
        _ = deadline => {
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            warn!(targets, elapsed_ms, "dispatch deadline elapsed");
            Err(FanoutError::Timeout { elapsed_ms, targets })
        }
        output = work => Ok(output),
    }
}
