//! Submission mapper — turns a raw form submission into the output record
//! handed to the downstream workflow.
//!
//! Values are keyed by position (`field-<index>`) on the way in and by label
//! on the way out. Coercion is best-effort: see [`crate::coerce`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use chrono_tz::Tz;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::coerce::{parse_choices, reformat_date, to_number, to_text};
use crate::context::{BinaryData, BinaryStorage, Clock};
use crate::field::{FieldDefinition, FieldKind};
use crate::FormError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A file received through a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Temporary location of the uploaded bytes.
    pub filepath: String,
    pub original_filename: Option<String>,
    /// Name the upload handler stored the file under.
    pub new_filename: String,
    pub mimetype: String,
    pub size: u64,
}

impl UploadedFile {
    fn summary(&self) -> Value {
        json!({
            "filename": self.original_filename,
            "mimetype": self.mimetype,
            "size": self.size,
        })
    }

    fn display_name(&self) -> &str {
        self.original_filename.as_deref().unwrap_or(&self.new_filename)
    }
}

/// One or several uploads for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadedFiles {
    Multiple(Vec<UploadedFile>),
    Single(UploadedFile),
}

/// Raw body of a form submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Submitted values keyed by `field-<index>`.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Uploaded files keyed by `field-<index>`.
    #[serde(default)]
    pub files: BTreeMap<String, UploadedFiles>,
}

/// Whether the execution is a test run from the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Test,
    #[default]
    Production,
}

impl fmt::Display for FormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl FromStr for FormMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test"       => Ok(Self::Test),
            "production" => Ok(Self::Production),
            other        => Err(format!("unknown form mode: {other}")),
        }
    }
}

/// Node type of the form trigger that starts a workflow.
pub const FORM_TRIGGER_NODE_TYPE: &str = "n8n-nodes-base.formTrigger";

/// Node type of a form page shown mid-workflow.
pub const FORM_NODE_TYPE: &str = "n8n-nodes-base.form";

/// Which entry point received the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionSource {
    /// The form trigger that starts the workflow.
    FormTrigger,
    /// A form page shown mid-workflow.
    FormNode,
}

impl SubmissionSource {
    pub fn for_node_type(node_type: &str) -> Option<Self> {
        match node_type {
            FORM_TRIGGER_NODE_TYPE => Some(Self::FormTrigger),
            FORM_NODE_TYPE => Some(Self::FormNode),
            _ => None,
        }
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            Self::FormTrigger => FORM_TRIGGER_NODE_TYPE,
            Self::FormNode => FORM_NODE_TYPE,
        }
    }
}

/// Everything the mapper reads from one incoming request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub payload: SubmissionPayload,
    /// Query string of the submitting page.
    pub query: BTreeMap<String, String>,
    pub source: SubmissionSource,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A mapped value. Numbers stay `f64` so `NaN` survives until serialization,
/// where it becomes `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Number(f64),
    Json(Value),
}

impl OutputValue {
    pub fn null() -> Self {
        Self::Json(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Json(v) => v.as_f64(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Number(_) => None,
        }
    }
}

impl From<Value> for OutputValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Structured result of a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputRecord {
    pub json: BTreeMap<String, OutputValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
}

impl OutputRecord {
    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        self.json.get(key)
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Map positional submitted values onto output keys, coercing per field type.
pub fn add_form_response_data(
    fields: &[FieldDefinition],
    body: &Map<String, Value>,
) -> BTreeMap<String, OutputValue> {
    fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            let value = body.get(&format!("field-{index}"));
            map_field(field, value)
        })
        .collect()
}

fn map_field(field: &FieldDefinition, value: Option<&Value>) -> Option<(String, OutputValue)> {
    let key = field.output_key()?.to_string();

    let value = match value {
        None | Some(Value::Null) => return Some((key, OutputValue::null())),
        Some(v) => v,
    };

    let mapped = match &field.kind {
        FieldKind::Number => OutputValue::Number(to_number(value)),
        FieldKind::Text => Value::String(to_text(value).trim().to_string()).into(),
        FieldKind::Radio { .. } => match value {
            Value::String(raw) => match parse_choices(raw) {
                Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null).into(),
                other => other.into(),
            },
            other => other.clone().into(),
        },
        FieldKind::Checkbox { .. } | FieldKind::Dropdown { multiselect: true, .. } => match value {
            Value::String(raw) => parse_choices(raw).into(),
            other => other.clone().into(),
        },
        FieldKind::Date { format_date: Some(format) } if is_truthy(value) => {
            match reformat_date(&to_text(value), format) {
                Some(formatted) => Value::String(formatted).into(),
                None => {
                    debug!("'{}' is not a submitted date, keeping it as is", field.label);
                    value.clone().into()
                }
            }
        }
        FieldKind::File { multiple_files: true, .. } if !value.is_array() => {
            Value::Array(vec![value.clone()]).into()
        }
        _ => value.clone().into(),
    };

    Some((key, mapped))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Binary property name for a label: non-word characters become `_`.
pub fn binary_property_name(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Label of the field a `field-<index>` key points at, or the key itself.
fn label_for_key<'a>(fields: &'a [FieldDefinition], key: &'a str) -> &'a str {
    key.strip_prefix("field-")
        .and_then(|index| index.parse::<usize>().ok())
        .and_then(|index| fields.get(index))
        .map_or(key, |field| field.label.as_str())
}

// ---------------------------------------------------------------------------
// SubmissionMapper
// ---------------------------------------------------------------------------

/// Builds output records, copying uploads through `storage`.
pub struct SubmissionMapper<'a> {
    storage: &'a dyn BinaryStorage,
    clock: &'a dyn Clock,
}

impl<'a> SubmissionMapper<'a> {
    pub fn new(storage: &'a dyn BinaryStorage, clock: &'a dyn Clock) -> Self {
        Self { storage, clock }
    }

    /// Map one submission into an output record.
    ///
    /// All uploads are copied concurrently; the record is only returned once
    /// every copy has finished.
    ///
    /// # Errors
    /// Returns the first [`FormError::Storage`] raised by a file copy.
    #[instrument(skip_all, fields(mode = %mode, fields = fields.len(), files = request.payload.files.len()))]
    pub async fn prepare_form_return_item(
        &self,
        request: &SubmissionRequest,
        fields: &[FieldDefinition],
        mode: FormMode,
        use_workflow_timezone: bool,
    ) -> Result<OutputRecord, FormError> {
        let mut body = request.payload.data.clone();
        let mut copies = Vec::new();

        for (key, uploads) in &request.payload.files {
            let (files, multi_file) = match uploads {
                UploadedFiles::Multiple(files) => {
                    body.insert(key.clone(), files.iter().map(UploadedFile::summary).collect());
                    (files.as_slice(), true)
                }
                UploadedFiles::Single(file) => {
                    body.insert(key.clone(), file.summary());
                    (std::slice::from_ref(file), false)
                }
            };

            let base_name = binary_property_name(label_for_key(fields, key));
            for (count, file) in files.iter().enumerate() {
                let property = if multi_file {
                    format!("{base_name}_{count}")
                } else {
                    base_name.clone()
                };
                copies.push((property, file));
            }
        }

        let stored = try_join_all(copies.iter().map(|(_, file)| {
            self.storage
                .copy_binary_file(&file.filepath, file.display_name(), &file.mimetype)
        }))
        .await?;

        let binary: BTreeMap<String, BinaryData> = copies
            .into_iter()
            .map(|(property, _)| property)
            .zip(stored)
            .collect();

        let mut json = add_form_response_data(fields, &body);
        json.insert(
            "submittedAt".to_string(),
            Value::String(self.submitted_at(use_workflow_timezone)).into(),
        );
        json.insert("formMode".to_string(), Value::String(mode.to_string()).into());

        if request.source == SubmissionSource::FormTrigger && !request.query.is_empty() {
            let query: Map<String, Value> = request
                .query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            json.insert("formQueryParameters".to_string(), Value::Object(query).into());
        }

        info!(outputs = json.len(), binaries = binary.len(), "form submission mapped");
        Ok(OutputRecord { json, binary })
    }

    /// Current instant as ISO-8601 with milliseconds.
    fn submitted_at(&self, use_workflow_timezone: bool) -> String {
        let now = self.clock.now();
        if !use_workflow_timezone {
            return now.to_rfc3339_opts(SecondsFormat::Millis, true);
        }

        let name = self.clock.workflow_timezone();
        match name.parse::<Tz>() {
            Ok(tz) => now.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Millis, false),
            Err(_) => {
                warn!("unknown workflow timezone '{}', using UTC", name);
                now.to_rfc3339_opts(SecondsFormat::Millis, true)
            }
        }
    }
}
