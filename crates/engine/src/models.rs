//! Workflow domain models.
//!
//! The shape a workflow definition file has on disk: nodes carrying their
//! host node type, type version and parameters, plus the edges between them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// NodeDefinition
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    /// Host node type, e.g. `n8n-nodes-base.formTrigger`.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: f64,
    /// Node parameters as configured in the editor.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

fn default_type_version() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// IANA timezone the workflow runs in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Workflow {
    /// Convenience constructor for testing.
    pub fn new(name: impl Into<String>, nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            nodes,
            edges,
            timezone: default_timezone(),
        }
    }

    /// Nodes of the given host type, in definition order.
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a NodeDefinition> + 'a {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }
}

impl NodeDefinition {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            type_version: default_type_version(),
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_version(mut self, type_version: f64) -> Self {
        self.type_version = type_version;
        self
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}
