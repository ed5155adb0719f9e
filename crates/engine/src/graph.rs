//! Workflow graph — structural validation and downstream lookups.
//!
//! Rules enforced by [`WorkflowGraph::new`]:
//! 1. Node IDs must be unique within the workflow.
//! 2. Every edge must reference valid node IDs (both `from` and `to`).
//!
//! Acyclicity is checked separately by [`WorkflowGraph::execution_order`],
//! since downstream lookups stay well-defined on cyclic graphs.

use std::collections::{HashMap, HashSet, VecDeque};

use forms::{ConnectedNode, WorkflowGraphInspector};

use crate::{models::NodeDefinition, EngineError, Workflow};

/// Adjacency view over a validated workflow.
#[derive(Debug)]
pub struct WorkflowGraph<'a> {
    workflow: &'a Workflow,
    nodes: HashMap<&'a str, &'a NodeDefinition>,
    /// Children per node, in edge order.
    adjacency: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> WorkflowGraph<'a> {
    /// Index `workflow`, rejecting duplicate IDs and dangling edges.
    ///
    /// # Errors
    /// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
    /// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
    pub fn new(workflow: &'a Workflow) -> Result<Self, EngineError> {
        let mut nodes: HashMap<&str, &NodeDefinition> = HashMap::with_capacity(workflow.nodes.len());
        for node in &workflow.nodes {
            if nodes.insert(node.id.as_str(), node).is_some() {
                return Err(EngineError::DuplicateNodeId(node.id.clone()));
            }
        }

        let mut adjacency: HashMap<&str, Vec<&str>> =
            nodes.keys().map(|&id| (id, Vec::new())).collect();

        for edge in &workflow.edges {
            for (node_id, side) in [(&edge.from, "from"), (&edge.to, "to")] {
                if !nodes.contains_key(node_id.as_str()) {
                    return Err(EngineError::UnknownNodeReference {
                        node_id: node_id.clone(),
                        side,
                    });
                }
            }
            if let Some(children) = adjacency.get_mut(edge.from.as_str()) {
                children.push(edge.to.as_str());
            }
        }

        Ok(Self { workflow, nodes, adjacency })
    }

    pub fn node(&self, id: &str) -> Result<&'a NodeDefinition, EngineError> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownNode(id.to_string()))
    }

    /// Every node reachable from `id`, breadth-first, each listed once.
    ///
    /// `id` itself is only included when it sits on a cycle.
    pub fn descendants(&self, id: &str) -> Vec<&'a NodeDefinition> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = self
            .adjacency
            .get(id)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default();
        let mut found = Vec::new();

        while let Some(node_id) = queue.pop_front() {
            if !seen.insert(node_id) {
                continue;
            }
            found.push(self.nodes[node_id]);
            if let Some(children) = self.adjacency.get(node_id) {
                queue.extend(children.iter().copied());
            }
        }

        found
    }

    /// Nodes in a topological execution order (Kahn's algorithm).
    ///
    /// Ties are broken by definition order so the result is deterministic.
    ///
    /// # Errors
    /// [`EngineError::CycleDetected`] if the graph is not acyclic.
    pub fn execution_order(&self) -> Result<Vec<String>, EngineError> {
        let mut in_degree: HashMap<&str, usize> = self.nodes.keys().map(|&id| (id, 0)).collect();
        for children in self.adjacency.values() {
            for &child in children {
                *in_degree.entry(child).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<&str> = self
            .workflow
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree[id] == 0)
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop_front() {
            sorted.push(node_id.to_owned());
            for &child in &self.adjacency[node_id] {
                let degree = in_degree.entry(child).or_insert(0);
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            return Err(EngineError::CycleDetected);
        }

        Ok(sorted)
    }
}

impl WorkflowGraphInspector for WorkflowGraph<'_> {
    fn connected_nodes(&self, node_name: &str) -> Vec<ConnectedNode> {
        self.descendants(node_name)
            .into_iter()
            .map(|node| ConnectedNode {
                name: node.id.clone(),
                node_type: node.node_type.clone(),
                type_version: node.type_version,
            })
            .collect()
    }
}
