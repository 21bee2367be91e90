//! Per-invocation execution context.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything a field resolution needs from its caller: the deadline and
/// cancellation signal governing the whole fan-out, plus the field arguments
/// used to build upstream requests.
///
/// Cloning is cheap enough to hand a copy to each call; clones share the
/// same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    arguments: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the whole resolution by `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an externally owned token, typically a child of the request's token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_cancellation() {
        let context = ExecutionContext::new();
        let clone = context.clone();
        context.cancellation().cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn timeout_sets_deadline_in_the_future() {
        let context = ExecutionContext::new()
            .with_timeout(Duration::from_secs(5))
            .with_argument("user", json!("ada"));
        let deadline = context.deadline().expect("deadline set");
        assert!(deadline > Instant::now());
        assert_eq!(context.arguments().get("user"), Some(&json!("ada")));
    }
}
