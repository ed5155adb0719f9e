//! Collaborators the pipeline consumes from the host.
//!
//! Each trait is the narrow slice of host functionality one pipeline stage
//! needs; the host (or a test double from [`crate::mock`]) supplies the
//! implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FormError;

/// Evaluates one `{{ ... }}` placeholder in the host's expression language.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str) -> Result<Value, FormError>;
}

/// A node reachable downstream of the form node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedNode {
    pub name: String,
    /// Fully-qualified node type, e.g. `n8n-nodes-base.respondToWebhook`.
    #[serde(rename = "type")]
    pub node_type: String,
    pub type_version: f64,
}

/// Read-only view of the workflow graph around a node.
pub trait WorkflowGraphInspector: Send + Sync {
    /// All nodes downstream of `node_name`.
    fn connected_nodes(&self, node_name: &str) -> Vec<ConnectedNode>;
}

/// Handle to a file copied into the host's binary storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    /// Storage-specific identifier of the stored bytes.
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: u64,
}

/// Copies uploaded files out of the temporary upload area.
#[async_trait]
pub trait BinaryStorage: Send + Sync {
    async fn copy_binary_file(
        &self,
        path: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Result<BinaryData, FormError>;
}

/// Source of the current instant and the workflow's configured timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// IANA timezone name, e.g. `Europe/Berlin`.
    fn workflow_timezone(&self) -> &str;
}

/// Wall clock paired with a fixed workflow timezone.
#[derive(Debug, Clone)]
pub struct SystemClock {
    timezone: String,
}

impl SystemClock {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self { timezone: timezone.into() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new("UTC")
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn workflow_timezone(&self) -> &str {
        &self.timezone
    }
}
