//! `engine` crate — workflow domain models, graph validation, and the graph
//! view the form pipeline inspects.

pub mod models;
pub mod error;
pub mod graph;
pub mod validation;

pub use models::{Workflow, NodeDefinition, Edge};
pub use error::EngineError;
pub use graph::WorkflowGraph;
pub use validation::validate_workflow;
