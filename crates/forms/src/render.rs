//! Render-data builder — turns the field schema into the flat model the form
//! template consumes.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::field::{FieldDefinition, FieldKind};
use crate::sanitize::sanitize_custom_css;

/// Page description used when the form has none.
pub const DEFAULT_DESCRIPTION_METADATA: &str = "n8n form";

/// Shown after submitting when no custom text is configured.
pub const DEFAULT_SUBMITTED_TEXT: &str = "Your response has been recorded";

/// Target of the "Form automated with ..." footer link.
pub const ATTRIBUTION_BASE_URL: &str =
    "https://n8n.io/?utm_source=n8n-internal&utm_medium=form-trigger";

const DESCRIPTION_METADATA_MAX_CHARS: usize = 150;

/// Presentation options for one render request.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub form_title: String,
    pub form_description: String,
    pub form_submitted_header: Option<String>,
    /// `None` falls back to [`DEFAULT_SUBMITTED_TEXT`].
    pub form_submitted_text: Option<String>,
    pub redirect_url: Option<String>,
    pub test_run: bool,
    /// Query parameters of the page request; pre-fill defaults by label.
    pub query: BTreeMap<String, String>,
    pub instance_id: Option<String>,
    pub use_response_data: Option<bool>,
    pub append_attribution: bool,
    pub button_label: Option<String>,
    pub custom_css: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            form_title: String::new(),
            form_description: String::new(),
            form_submitted_header: None,
            form_submitted_text: None,
            redirect_url: None,
            test_run: false,
            query: BTreeMap::new(),
            instance_id: None,
            use_response_data: None,
            append_attribution: true,
            button_label: None,
            custom_css: None,
        }
    }
}

/// Template-ready form page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub test_run: bool,
    pub form_title: String,
    pub form_description: String,
    pub form_description_metadata: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_submitted_header: Option<String>,
    pub form_submitted_text: String,
    #[serde(rename = "n8nWebsiteLink")]
    pub attribution_link: String,
    pub form_fields: Vec<RenderField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_response_data: Option<bool>,
    pub append_attribution: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dangerous_custom_css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// One rendered input, positionally tied to its field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderField {
    pub id: String,
    pub error_id: String,
    pub label: String,
    /// `form-required` or empty; used directly as a CSS class.
    pub input_required: String,
    pub default_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(flatten)]
    pub shape: RenderShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSelectOption {
    pub id: String,
    pub label: String,
}

/// How a field is drawn. Exactly one `is*` flag reaches the template.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderShape {
    /// `<input>` with a type used for client-side validation hints.
    Input { input_type: &'static str },
    Textarea,
    Select { options: Vec<String> },
    MultiSelect { options: Vec<MultiSelectOption>, radio: bool },
    FileInput { accept_file_types: Option<String>, multiple: bool },
    Html { html: String },
    Hidden { name: String, value: String },
}

impl Serialize for RenderShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Input { input_type } => {
                map.serialize_entry("isInput", &true)?;
                map.serialize_entry("type", input_type)?;
            }
            Self::Textarea => map.serialize_entry("isTextarea", &true)?,
            Self::Select { options } => {
                map.serialize_entry("isSelect", &true)?;
                map.serialize_entry("selectOptions", options)?;
            }
            Self::MultiSelect { options, radio } => {
                map.serialize_entry("isMultiSelect", &true)?;
                map.serialize_entry("multiSelectOptions", options)?;
                if *radio {
                    map.serialize_entry("radioSelect", "radio")?;
                }
            }
            Self::FileInput { accept_file_types, multiple } => {
                map.serialize_entry("isFileInput", &true)?;
                if let Some(types) = accept_file_types {
                    map.serialize_entry("acceptFileTypes", types)?;
                }
                map.serialize_entry("multipleFiles", if *multiple { "multiple" } else { "" })?;
            }
            Self::Html { html } => {
                map.serialize_entry("isHtml", &true)?;
                map.serialize_entry("html", html)?;
            }
            Self::Hidden { name, value } => {
                map.serialize_entry("isHidden", &true)?;
                map.serialize_entry("hiddenName", name)?;
                map.serialize_entry("hiddenValue", value)?;
            }
        }
        map.end()
    }
}

/// Short plain-text description for the page's meta tags.
pub fn create_description_metadata(description: &str) -> String {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    if description.is_empty() {
        return DEFAULT_DESCRIPTION_METADATA.to_string();
    }

    let markup = MARKUP.get_or_init(|| {
        Regex::new(r"^\s*\n+|</?[^>]+(>|$)").expect("description markup pattern is valid")
    });
    markup
        .replace_all(description, "")
        .chars()
        .take(DESCRIPTION_METADATA_MAX_CHARS)
        .collect()
}

/// Prefix scheme-less redirect targets with `http://`.
pub fn normalize_redirect_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Footer link, tagged with the instance as campaign when known.
pub fn attribution_link(instance_id: Option<&str>) -> String {
    match instance_id {
        Some(id) if !id.is_empty() => format!("{ATTRIBUTION_BASE_URL}&utm_campaign={id}"),
        _ => ATTRIBUTION_BASE_URL.to_string(),
    }
}

/// Build the render model for `fields`.
pub fn prepare_form_data(options: &RenderOptions, fields: &[FieldDefinition]) -> RenderModel {
    RenderModel {
        test_run: options.test_run,
        form_title: options.form_title.clone(),
        form_description: options.form_description.clone(),
        form_description_metadata: create_description_metadata(&options.form_description),
        form_submitted_header: options.form_submitted_header.clone(),
        form_submitted_text: options
            .form_submitted_text
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBMITTED_TEXT.to_string()),
        attribution_link: attribution_link(options.instance_id.as_deref()),
        form_fields: fields
            .iter()
            .enumerate()
            .map(|(index, field)| render_field(index, field, &options.query))
            .collect(),
        use_response_data: options.use_response_data,
        append_attribution: options.append_attribution,
        button_label: options.button_label.clone(),
        dangerous_custom_css: sanitize_custom_css(options.custom_css.as_deref()),
        redirect_url: options
            .redirect_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(normalize_redirect_url),
    }
}

fn render_field(index: usize, field: &FieldDefinition, query: &BTreeMap<String, String>) -> RenderField {
    let id = format!("field-{index}");
    let default_value = query.get(&field.label).cloned().unwrap_or_default();
    let shape = render_shape(&id, field, &default_value);

    RenderField {
        error_id: format!("error-{id}"),
        label: field.label.clone(),
        input_required: if field.required { "form-required".to_string() } else { String::new() },
        default_value,
        placeholder: field.placeholder.clone(),
        shape,
        id,
    }
}

fn render_shape(id: &str, field: &FieldDefinition, default_value: &str) -> RenderShape {
    let choices = |options: &[String], radio: bool| RenderShape::MultiSelect {
        options: options
            .iter()
            .enumerate()
            .map(|(i, label)| MultiSelectOption {
                id: format!("option{i}_{id}"),
                label: label.clone(),
            })
            .collect(),
        radio,
    };

    match &field.kind {
        FieldKind::Dropdown { options, multiselect: true } => choices(options, false),
        FieldKind::Checkbox { options } => choices(options, false),
        FieldKind::Radio { options } => choices(options, true),
        FieldKind::File { accept_file_types, multiple_files } => RenderShape::FileInput {
            accept_file_types: accept_file_types.clone(),
            multiple: *multiple_files,
        },
        FieldKind::Dropdown { options, multiselect: false } => RenderShape::Select {
            options: options.clone(),
        },
        FieldKind::Textarea => RenderShape::Textarea,
        FieldKind::Html { html, .. } => RenderShape::Html { html: html.clone() },
        FieldKind::HiddenField { name, value } => RenderShape::Hidden {
            name: name.clone(),
            value: if default_value.is_empty() { value.clone() } else { default_value.to_string() },
        },
        FieldKind::Text
        | FieldKind::Number
        | FieldKind::Date { .. }
        | FieldKind::Email
        | FieldKind::Password => RenderShape::Input {
            input_type: field.field_type().as_str(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("Name", FieldKind::Text).required(),
            FieldDefinition::new("Pick", FieldKind::Radio { options: vec!["A".into(), "B".into()] }),
            FieldDefinition::new(
                "Docs",
                FieldKind::File { accept_file_types: Some(".pdf".into()), multiple_files: true },
            ),
            FieldDefinition::new(
                "Size",
                FieldKind::Dropdown { options: vec!["S".into(), "M".into()], multiselect: false },
            ),
            FieldDefinition::new("Notes", FieldKind::Textarea),
            FieldDefinition::new("", FieldKind::Html { html: "<hr>".into(), element_name: None }),
            FieldDefinition::new(
                "source",
                FieldKind::HiddenField { name: "source".into(), value: "web".into() },
            ),
        ]
    }

    #[test]
    fn one_render_field_per_definition_with_positional_ids() {
        let model = prepare_form_data(&RenderOptions::default(), &schema());
        let ids: Vec<_> = model.form_fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            ["field-0", "field-1", "field-2", "field-3", "field-4", "field-5", "field-6"]
        );
        assert_eq!(model.form_fields[2].error_id, "error-field-2");
    }

    #[test]
    fn rendering_is_deterministic() {
        let options = RenderOptions { form_title: "T".into(), ..RenderOptions::default() };
        assert_eq!(prepare_form_data(&options, &schema()), prepare_form_data(&options, &schema()));
    }

    #[test]
    fn shapes_follow_field_kind() {
        let model = prepare_form_data(&RenderOptions::default(), &schema());
        let fields = &model.form_fields;

        assert_eq!(fields[0].shape, RenderShape::Input { input_type: "text" });
        assert_eq!(fields[0].input_required, "form-required");
        assert_eq!(
            fields[1].shape,
            RenderShape::MultiSelect {
                options: vec![
                    MultiSelectOption { id: "option0_field-1".into(), label: "A".into() },
                    MultiSelectOption { id: "option1_field-1".into(), label: "B".into() },
                ],
                radio: true,
            }
        );
        assert_eq!(
            fields[2].shape,
            RenderShape::FileInput { accept_file_types: Some(".pdf".into()), multiple: true }
        );
        assert_eq!(fields[3].shape, RenderShape::Select { options: vec!["S".into(), "M".into()] });
        assert_eq!(fields[4].shape, RenderShape::Textarea);
        assert_eq!(fields[5].shape, RenderShape::Html { html: "<hr>".into() });
        assert_eq!(
            fields[6].shape,
            RenderShape::Hidden { name: "source".into(), value: "web".into() }
        );
    }

    #[test]
    fn multiselect_dropdown_renders_as_choices() {
        let fields = vec![FieldDefinition::new(
            "Tags",
            FieldKind::Dropdown { options: vec!["x".into()], multiselect: true },
        )];
        let model = prepare_form_data(&RenderOptions::default(), &fields);
        assert!(matches!(
            &model.form_fields[0].shape,
            RenderShape::MultiSelect { radio: false, options } if options.len() == 1
        ));
    }

    #[test]
    fn query_parameters_prefill_defaults_and_win_for_hidden_fields() {
        let options = RenderOptions {
            query: BTreeMap::from([
                ("Name".to_string(), "Ann".to_string()),
                ("source".to_string(), "ads".to_string()),
            ]),
            ..RenderOptions::default()
        };
        let model = prepare_form_data(&options, &schema());
        assert_eq!(model.form_fields[0].default_value, "Ann");
        assert_eq!(model.form_fields[4].default_value, "");
        assert_eq!(
            model.form_fields[6].shape,
            RenderShape::Hidden { name: "source".into(), value: "ads".into() }
        );
    }

    #[test]
    fn description_metadata() {
        assert_eq!(create_description_metadata(""), DEFAULT_DESCRIPTION_METADATA);
        assert_eq!(create_description_metadata("\n\nwelcome"), "welcome");
        // Only blank lines at the very start are dropped; text between tags survives.
        assert_eq!(create_description_metadata("<b>Hi</b>\n\nwelcome"), "Hi\n\nwelcome");
        assert_eq!(create_description_metadata("<p>half open"), "half open");
        assert_eq!(create_description_metadata(&"x".repeat(400)).chars().count(), 150);
    }

    #[test]
    fn redirect_url_gets_a_scheme() {
        assert_eq!(normalize_redirect_url("example.com/thanks"), "http://example.com/thanks");
        assert_eq!(normalize_redirect_url("https://example.com"), "https://example.com");

        let options = RenderOptions {
            redirect_url: Some("example.com/thanks".into()),
            ..RenderOptions::default()
        };
        let model = prepare_form_data(&options, &[]);
        assert_eq!(model.redirect_url.as_deref(), Some("http://example.com/thanks"));
    }

    #[test]
    fn attribution_link_carries_campaign() {
        assert_eq!(attribution_link(None), ATTRIBUTION_BASE_URL);
        assert_eq!(
            attribution_link(Some("abc")),
            format!("{ATTRIBUTION_BASE_URL}&utm_campaign=abc")
        );
    }

    #[test]
    fn defaults_and_custom_css() {
        let options = RenderOptions {
            custom_css: Some("<script>x()</script>p { color: red }".into()),
            ..RenderOptions::default()
        };
        let model = prepare_form_data(&options, &[]);
        assert_eq!(model.form_submitted_text, DEFAULT_SUBMITTED_TEXT);
        assert!(model.append_attribution);
        assert_eq!(model.dangerous_custom_css.as_deref(), Some("p { color: red }"));
    }

    #[test]
    fn serializes_template_flags() {
        let model = prepare_form_data(&RenderOptions::default(), &schema());
        let value = serde_json::to_value(&model).unwrap();

        assert_eq!(
            value["formFields"][0],
            json!({
                "id": "field-0",
                "errorId": "error-field-0",
                "label": "Name",
                "inputRequired": "form-required",
                "defaultValue": "",
                "isInput": true,
                "type": "text"
            })
        );
        assert_eq!(value["formFields"][1]["radioSelect"], "radio");
        assert_eq!(value["formFields"][2]["multipleFiles"], "multiple");
        assert_eq!(value["formFields"][3]["selectOptions"], json!(["S", "M"]));
        assert_eq!(value["n8nWebsiteLink"], ATTRIBUTION_BASE_URL);
    }
}
