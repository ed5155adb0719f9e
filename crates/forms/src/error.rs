//! Error types for the form pipeline.

use thiserror::Error;

/// Configuration errors raised by the response-mode validator.
///
/// The variant is the machine-checkable category; [`ResponseModeError::description`]
/// carries the remediation shown to the workflow author.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseModeError {
    /// `responseMode` is `responseNode` but nothing downstream can respond.
    #[error("No Respond to Webhook node found in the workflow")]
    MissingRespondNode,

    /// A respond node is connected but the form answers on its own.
    #[error("{node_name} node not correctly configured")]
    RespondNodeMismatch { node_name: String },

    /// Newer form versions answer through a form-ending page instead.
    #[error("The \"Respond to Webhook\" node is not supported in workflows initiated by the \"n8n Form Trigger\"")]
    RespondNodeUnsupported,
}

impl ResponseModeError {
    /// Human-readable remediation for the workflow author.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingRespondNode => {
                "Insert a Respond to Webhook node to your workflow to respond to the form submission or choose another option for the \u{201c}Respond When\u{201d} parameter"
            }
            Self::RespondNodeMismatch { .. } => {
                "Set the \u{201c}Respond When\u{201d} parameter to \u{201c}Using Respond to Webhook Node\u{201d} or remove the Respond to Webhook node"
            }
            Self::RespondNodeUnsupported => {
                "To configure your response, add an \"n8n Form\" node and set the \"Page Type\" to \"Form Ending\""
            }
        }
    }
}

/// Errors surfaced by the form pipeline.
///
/// Coercion of submitted values never lands here: malformed input degrades
/// to `NaN` or to the unparsed value instead.
#[derive(Debug, Error)]
pub enum FormError {
    /// The field schema could not be read.
    #[error("invalid form field schema: {0}")]
    Schema(String),

    /// The surrounding workflow is misconfigured.
    #[error(transparent)]
    ResponseMode(#[from] ResponseModeError),

    /// Copying an uploaded file into binary storage failed.
    #[error("failed to store uploaded file '{file_name}': {message}")]
    Storage { file_name: String, message: String },

    /// The external expression evaluator rejected a placeholder.
    #[error("failed to evaluate expression '{expression}': {message}")]
    Expression { expression: String, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
