//! `forms` crate — the form page and submission pipeline.
//!
//! - [`render`] builds the template model for a field schema.
//! - [`response_mode`] checks the "Respond When" setting against the graph.
//! - [`submission`] maps a raw submission (values + uploads) to an output record.
//! - [`resolve`] expands `{{ ... }}` placeholders through the host evaluator.
//!
//! Host functionality is reached only through the traits in [`context`].

pub mod coerce;
pub mod context;
pub mod error;
pub mod field;
pub mod mock;
pub mod render;
pub mod resolve;
pub mod response_mode;
pub mod sanitize;
pub mod submission;

pub use context::{
    BinaryData, BinaryStorage, Clock, ConnectedNode, ExpressionEvaluator, SystemClock,
    WorkflowGraphInspector,
};
pub use error::{FormError, ResponseModeError};
pub use field::{parse_form_fields_json, FieldDefinition, FieldKind, FieldType, FormDefinition};
pub use render::{prepare_form_data, RenderField, RenderModel, RenderOptions, RenderShape};
pub use resolve::resolve_raw_data;
pub use response_mode::{
    validate_response_mode, validate_response_mode_configuration, ResponseMode,
};
pub use sanitize::sanitize_custom_css;
pub use submission::{
    add_form_response_data, FormMode, OutputRecord, OutputValue, SubmissionMapper,
    SubmissionPayload, SubmissionRequest, SubmissionSource, UploadedFile, UploadedFiles,
    FORM_NODE_TYPE, FORM_TRIGGER_NODE_TYPE,
};
