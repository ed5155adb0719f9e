//! Engine-level error types.

use forms::ResponseModeError;
use thiserror::Error;

/// Errors produced while validating a workflow definition.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Graph errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    /// A lookup named a node that is not part of the workflow.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    // ------ Node configuration errors ------

    /// A node parameter could not be read.
    #[error("node '{node_id}' has an invalid parameter: {message}")]
    InvalidParameter {
        node_id: String,
        message: String,
    },

    /// A form trigger's response mode does not match the graph around it.
    #[error("node '{node_id}': {source}")]
    ResponseMode {
        node_id: String,
        #[source]
        source: ResponseModeError,
    },
}
