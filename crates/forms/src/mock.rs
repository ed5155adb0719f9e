//! Test doubles for the host collaborators.
//!
//! Useful in unit and integration tests where the real host is either
//! unavailable or irrelevant. Each double records the calls it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::context::{BinaryData, BinaryStorage, Clock, ConnectedNode, ExpressionEvaluator, WorkflowGraphInspector};
use crate::FormError;

/// Evaluator answering from a fixed expression → value table.
///
/// Unknown expressions fail with [`FormError::Expression`].
#[derive(Default)]
pub struct MockEvaluator {
    answers: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, expression: impl Into<String>, value: Value) -> Self {
        self.answers.insert(expression.into(), value);
        self
    }

    /// Expressions seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ExpressionEvaluator for MockEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Value, FormError> {
        self.calls.lock().unwrap().push(expression.to_string());
        self.answers
            .get(expression)
            .cloned()
            .ok_or_else(|| FormError::Expression {
                expression: expression.to_string(),
                message: "no value configured".to_string(),
            })
    }
}

/// Graph with hand-written child lists per node.
#[derive(Default)]
pub struct StaticGraph {
    children: HashMap<String, Vec<ConnectedNode>>,
}

impl StaticGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(mut self, node_name: impl Into<String>, children: Vec<ConnectedNode>) -> Self {
        self.children.insert(node_name.into(), children);
        self
    }
}

impl WorkflowGraphInspector for StaticGraph {
    fn connected_nodes(&self, node_name: &str) -> Vec<ConnectedNode> {
        self.children.get(node_name).cloned().unwrap_or_default()
    }
}

/// One `copy_binary_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub path: String,
    pub file_name: String,
    pub mime_type: String,
}

/// Storage that hands out sequential ids and never touches the disk.
#[derive(Default)]
pub struct MockBinaryStorage {
    /// Paths whose copy fails.
    failing_paths: Vec<String>,
    sizes: HashMap<String, u64>,
    pub calls: Arc<Mutex<Vec<CopyCall>>>,
}

impl MockBinaryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make copies from `path` fail.
    pub fn failing_on(mut self, path: impl Into<String>) -> Self {
        self.failing_paths.push(path.into());
        self
    }

    /// Report `size` for the file stored from `path`.
    pub fn with_size(mut self, path: impl Into<String>, size: u64) -> Self {
        self.sizes.insert(path.into(), size);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BinaryStorage for MockBinaryStorage {
    async fn copy_binary_file(
        &self,
        path: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Result<BinaryData, FormError> {
        self.calls.lock().unwrap().push(CopyCall {
            path: path.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
        });

        if self.failing_paths.iter().any(|p| p == path) {
            return Err(FormError::Storage {
                file_name: file_name.to_string(),
                message: format!("cannot read {path}"),
            });
        }

        Ok(BinaryData {
            id: format!("mock:{path}"),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            file_size: self.sizes.get(path).copied().unwrap_or_default(),
        })
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    pub now: DateTime<Utc>,
    pub timezone: String,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, timezone: impl Into<String>) -> Self {
        Self { now, timezone: timezone.into() }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn workflow_timezone(&self) -> &str {
        &self.timezone
    }
}
