//! The `ExecutableNode` trait — the contract every node must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::NodeError;

/// Shared context passed to every node during execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: uuid::Uuid,
    /// ID of the current execution run.
    pub execution_id: uuid::Uuid,
    /// IANA timezone configured for the workflow.
    pub timezone: String,
    /// Whether the run was started from the editor rather than in production.
    pub test_run: bool,
}

impl ExecutionContext {
    pub fn new(workflow_id: uuid::Uuid, timezone: impl Into<String>) -> Self {
        Self {
            workflow_id,
            execution_id: uuid::Uuid::new_v4(),
            timezone: timezone.into(),
            test_run: false,
        }
    }
}

/// The core node trait.
///
/// The host hands each node the JSON it received and forwards the JSON it
/// returns to the nodes downstream.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    async fn execute(
        &self,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, NodeError>;
}
