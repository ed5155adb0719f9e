//! Node-level error type.

use forms::FormError;
use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// The variant tells the host whether running the node again can help:
/// - `Retryable` — transient, e.g. binary storage was unavailable.
/// - `Fatal`     — the input or configuration is wrong; retrying won't fix it.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the host may re-try the node.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

impl From<FormError> for NodeError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Storage { .. } => Self::Retryable(err.to_string()),
            other => Self::Fatal(other.to_string()),
        }
    }
}
