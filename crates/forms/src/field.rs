//! Field schema — the ordered list of inputs a form is built from.
//!
//! Field definitions arrive in the host's parameter shape (`fieldLabel`,
//! `fieldType`, `fieldOptions.values[].option`, ...) and are folded into a
//! closed [`FieldKind`] so every consumer matches exhaustively on the type.

use serde::{Deserialize, Serialize};

use crate::FormError;

/// The `fieldType` discriminant as the host spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Email,
    Password,
    Textarea,
    Dropdown,
    Radio,
    Checkbox,
    File,
    Html,
    HiddenField,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Email => "email",
            Self::Password => "password",
            Self::Textarea => "textarea",
            Self::Dropdown => "dropdown",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::File => "file",
            Self::Html => "html",
            Self::HiddenField => "hiddenField",
        }
    }
}

/// Type-specific payload of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Email,
    Password,
    /// `format_date` is the output format applied to submitted dates.
    Date { format_date: Option<String> },
    Textarea,
    Dropdown { options: Vec<String>, multiselect: bool },
    Radio { options: Vec<String> },
    Checkbox { options: Vec<String> },
    File { accept_file_types: Option<String>, multiple_files: bool },
    /// Raw markup shown on the page; submitted under `element_name`.
    Html { html: String, element_name: Option<String> },
    /// Fixed name/value pair posted along with the form.
    HiddenField { name: String, value: String },
}

/// One entry of the field schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldDefinition")]
pub struct FieldDefinition {
    /// Display label, and the output key unless the kind overrides it.
    pub label: String,
    pub required: bool,
    pub placeholder: Option<String>,
    pub kind: FieldKind,
}

impl FieldDefinition {
    pub fn new(label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            label: label.into(),
            required: false,
            placeholder: None,
            kind,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn field_type(&self) -> FieldType {
        match &self.kind {
            FieldKind::Text => FieldType::Text,
            FieldKind::Number => FieldType::Number,
            FieldKind::Email => FieldType::Email,
            FieldKind::Password => FieldType::Password,
            FieldKind::Date { .. } => FieldType::Date,
            FieldKind::Textarea => FieldType::Textarea,
            FieldKind::Dropdown { .. } => FieldType::Dropdown,
            FieldKind::Radio { .. } => FieldType::Radio,
            FieldKind::Checkbox { .. } => FieldType::Checkbox,
            FieldKind::File { .. } => FieldType::File,
            FieldKind::Html { .. } => FieldType::Html,
            FieldKind::HiddenField { .. } => FieldType::HiddenField,
        }
    }

    /// Whether the submitted value is a JSON-encoded list of choices.
    pub fn is_multiselect(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Dropdown { multiselect: true, .. }
                | FieldKind::Radio { .. }
                | FieldKind::Checkbox { .. }
        )
    }

    /// Key the submitted value is written under, if any.
    ///
    /// HTML fields only produce output when an element name is configured.
    pub fn output_key(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Html { element_name, .. } => element_name.as_deref(),
            _ => Some(&self.label),
        }
    }
}

/// How the form's fields are supplied: as structured parameters or as a
/// JSON string typed into the node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormDefinition {
    Fields(Vec<FieldDefinition>),
    Json(String),
}

impl FormDefinition {
    pub fn fields(&self) -> Result<Vec<FieldDefinition>, FormError> {
        match self {
            Self::Fields(fields) => Ok(fields.clone()),
            Self::Json(raw) => parse_form_fields_json(raw),
        }
    }
}

impl Default for FormDefinition {
    fn default() -> Self {
        Self::Fields(Vec::new())
    }
}

/// Parse a JSON array of field objects, as entered in "Using JSON" mode.
pub fn parse_form_fields_json(raw: &str) -> Result<Vec<FieldDefinition>, FormError> {
    serde_json::from_str(raw).map_err(|e| FormError::Schema(e.to_string()))
}

// ---------------------------------------------------------------------------
// Host parameter shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldDefinition {
    field_label: Option<String>,
    field_type: Option<FieldType>,
    #[serde(default)]
    required_field: bool,
    placeholder: Option<String>,
    #[serde(default)]
    multiselect: bool,
    field_options: Option<RawFieldOptions>,
    accept_file_types: Option<String>,
    #[serde(default)]
    multiple_files: bool,
    format_date: Option<String>,
    html: Option<String>,
    element_name: Option<String>,
    field_name: Option<String>,
    field_value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFieldOptions {
    #[serde(default)]
    values: Vec<RawFieldOption>,
}

#[derive(Debug, Deserialize)]
struct RawFieldOption {
    option: String,
}

impl TryFrom<RawFieldDefinition> for FieldDefinition {
    type Error = String;

    fn try_from(raw: RawFieldDefinition) -> Result<Self, Self::Error> {
        let field_type = raw.field_type.unwrap_or(FieldType::Text);
        let options = || -> Vec<String> {
            raw.field_options
                .as_ref()
                .map(|o| o.values.iter().map(|v| v.option.clone()).collect())
                .unwrap_or_default()
        };

        let kind = match field_type {
            FieldType::Text => FieldKind::Text,
            FieldType::Number => FieldKind::Number,
            FieldType::Email => FieldKind::Email,
            FieldType::Password => FieldKind::Password,
            FieldType::Date => FieldKind::Date {
                format_date: raw.format_date.clone().filter(|f| !f.is_empty()),
            },
            FieldType::Textarea => FieldKind::Textarea,
            FieldType::Dropdown => FieldKind::Dropdown {
                options: options(),
                multiselect: raw.multiselect,
            },
            FieldType::Radio => FieldKind::Radio { options: options() },
            FieldType::Checkbox => FieldKind::Checkbox { options: options() },
            FieldType::File => FieldKind::File {
                accept_file_types: raw.accept_file_types.clone(),
                multiple_files: raw.multiple_files,
            },
            FieldType::Html => FieldKind::Html {
                html: raw.html.clone().unwrap_or_default(),
                element_name: raw.element_name.clone().filter(|n| !n.is_empty()),
            },
            FieldType::HiddenField => FieldKind::HiddenField {
                name: raw.field_name.clone().unwrap_or_default(),
                value: raw.field_value.clone().unwrap_or_default(),
            },
        };

        let label = match raw.field_label.or(raw.field_name) {
            Some(label) => label,
            None if field_type == FieldType::Html => String::new(),
            None => {
                return Err(format!(
                    "{} field is missing `fieldLabel`",
                    field_type.as_str()
                ))
            }
        };

        Ok(Self {
            label,
            required: raw.required_field,
            placeholder: raw.placeholder,
            kind,
        })
    }
}
