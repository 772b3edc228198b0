//! Action dispatch.
//!
//! Routes each pending action to the upstream collaborator registered for
//! its type (appointment, pharmacy, inventory services).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::queue::{ActionType, PendingAction};

/// Failure reported by an action handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Worth retrying on a later drain (network, upstream 5xx)
    #[error("transient failure: {0}")]
    Transient(String),

    /// Will never succeed (no handler, rejected payload)
    #[error("permanent failure: {0}")]
    Permanent(String),
}

// == Action Handler ==
/// Executes one kind of action against an upstream service.
///
/// Handlers receive the action id and should use it as an idempotency key
/// upstream: delivery is at-least-once.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, action: &PendingAction) -> Result<(), ExecutionError>;
}

/// Handler that only logs. Stands in for an upstream service that is not
/// wired into this deployment.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl ActionHandler for LoggingHandler {
    async fn execute(&self, action: &PendingAction) -> Result<(), ExecutionError> {
        info!(
            "Executed action {} ({}) payload={}",
            action.id, action.action_type, action.payload
        );
        Ok(())
    }
}

// == Dispatcher ==
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `action_type`, replacing any previous one.
    pub fn register(
        &mut self,
        action_type: impl Into<ActionType>,
        handler: Arc<dyn ActionHandler>,
    ) -> &mut Self {
        self.handlers.insert(action_type.into(), handler);
        self
    }

    pub fn with_handler(
        mut self,
        action_type: impl Into<ActionType>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        self.register(action_type, handler);
        self
    }

    pub fn handles(&self, action_type: &ActionType) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Runs the handler for the action's type. An unregistered type is a
    /// permanent failure.
    pub async fn dispatch(&self, action: &PendingAction) -> Result<(), ExecutionError> {
        match self.handlers.get(&action.action_type) {
            Some(handler) => handler.execute(action).await,
            None => Err(ExecutionError::Permanent(format!(
                "no handler registered for '{}'",
                action.action_type
            ))),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ActionIntent;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl ActionHandler for Counting {
        async fn execute(&self, _action: &PendingAction) -> Result<(), ExecutionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn action(action_type: ActionType) -> PendingAction {
        PendingAction::new("1".into(), ActionIntent::new(action_type, json!({})), 0)
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_type() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let dispatcher = Dispatcher::new().with_handler(ActionType::SendPrescription, counter.clone());

        dispatcher
            .dispatch(&action(ActionType::SendPrescription))
            .await
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_type_is_permanent() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch(&action(ActionType::from("teleport"))).await;
        assert!(matches!(result, Err(ExecutionError::Permanent(_))));
    }

    #[tokio::test]
    async fn test_logging_handler_succeeds() {
        let dispatcher = Dispatcher::new().with_handler(ActionType::RedirectPatient, Arc::new(LoggingHandler));
        assert!(dispatcher.handles(&ActionType::RedirectPatient));
        tokio_test::assert_ok!(dispatcher.dispatch(&action(ActionType::RedirectPatient)).await);
    }
}
