//! `nodes` crate — the `ExecutableNode` trait and the form node.
//!
//! Every node must implement [`ExecutableNode`]; the host dispatches
//! execution through this trait object.

pub mod error;
pub mod form;
pub mod storage;
pub mod traits;

pub use error::NodeError;
pub use form::{FormConfig, FormNode, SubmissionInput};
pub use storage::FilesystemStorage;
pub use traits::{ExecutableNode, ExecutionContext};
