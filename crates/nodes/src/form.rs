//! `FormNode` — binds a form configuration to the host.
//!
//! The same node serves both entry points: the form trigger that starts a
//! workflow and form pages shown mid-workflow. It renders the page, validates
//! its response mode against the graph, and turns submissions into the JSON
//! passed downstream.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use forms::{
    prepare_form_data, resolve_raw_data, validate_response_mode_configuration, BinaryStorage,
    Clock, ExpressionEvaluator, FieldDefinition, FormDefinition, FormError, FormMode, OutputRecord,
    RenderModel, RenderOptions, ResponseMode, SubmissionMapper, SubmissionPayload,
    SubmissionRequest, SubmissionSource, SystemClock, WorkflowGraphInspector,
};

use crate::traits::ExecutionContext;
use crate::{ExecutableNode, NodeError};

/// Type version new form nodes are created with.
pub const DEFAULT_FORM_VERSION: f64 = 2.2;

/// Where the field list comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefineForm {
    /// Structured `formFields` parameter.
    #[default]
    Fields,
    /// A JSON array typed into `jsonOutput`.
    Json,
}

/// Node parameters of a form, as stored in the workflow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    pub form_title: String,
    #[serde(default)]
    pub form_description: String,
    #[serde(default)]
    pub define_form: DefineForm,
    #[serde(default)]
    pub form_fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub json_output: Option<String>,
    #[serde(default)]
    pub response_mode: ResponseMode,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub form_submitted_header: Option<String>,
    /// May be an `=`-prefixed expression template.
    #[serde(default)]
    pub form_submitted_text: Option<String>,
    #[serde(default)]
    pub button_label: Option<String>,
    #[serde(default)]
    pub custom_css: Option<String>,
    #[serde(default = "default_true")]
    pub append_attribution: bool,
    #[serde(default)]
    pub use_workflow_timezone: bool,
    #[serde(default = "default_version")]
    pub type_version: f64,
}

fn default_true() -> bool {
    true
}

fn default_version() -> f64 {
    DEFAULT_FORM_VERSION
}

impl FormConfig {
    pub fn definition(&self) -> FormDefinition {
        match self.define_form {
            DefineForm::Fields => FormDefinition::Fields(self.form_fields.clone()),
            DefineForm::Json => FormDefinition::Json(self.json_output.clone().unwrap_or_default()),
        }
    }
}

/// Input `execute` expects: the raw submission plus the page's query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionInput {
    #[serde(flatten)]
    pub payload: SubmissionPayload,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
}

/// A form trigger or form page node.
pub struct FormNode {
    id: String,
    source: SubmissionSource,
    config: FormConfig,
    fields: Vec<FieldDefinition>,
    storage: Arc<dyn BinaryStorage>,
}

impl FormNode {
    /// Build the node, parsing its field list once.
    ///
    /// # Errors
    /// [`FormError::Schema`] when a JSON field list does not parse.
    pub fn new(
        id: impl Into<String>,
        source: SubmissionSource,
        config: FormConfig,
        storage: Arc<dyn BinaryStorage>,
    ) -> Result<Self, FormError> {
        let fields = config.definition().fields()?;
        Ok(Self {
            id: id.into(),
            source,
            config,
            fields,
            storage,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Render data for a page request.
    pub fn render(
        &self,
        query: BTreeMap<String, String>,
        test_run: bool,
        instance_id: Option<&str>,
    ) -> RenderModel {
        let options = RenderOptions {
            form_title: self.config.form_title.clone(),
            form_description: self.config.form_description.clone(),
            form_submitted_header: self.config.form_submitted_header.clone(),
            form_submitted_text: self.config.form_submitted_text.clone(),
            redirect_url: self.config.redirect_url.clone(),
            test_run,
            query,
            instance_id: instance_id.map(str::to_string),
            use_response_data: Some(self.config.response_mode == ResponseMode::ResponseNode),
            append_attribution: self.config.append_attribution,
            button_label: self.config.button_label.clone(),
            custom_css: self.config.custom_css.clone(),
        };
        prepare_form_data(&options, &self.fields)
    }

    /// Check the response mode of a form trigger against the graph.
    ///
    /// Form pages answer through the trigger and are not checked.
    pub fn validate(&self, graph: &dyn WorkflowGraphInspector) -> Result<(), FormError> {
        if self.source != SubmissionSource::FormTrigger {
            return Ok(());
        }
        validate_response_mode_configuration(
            graph,
            &self.id,
            self.config.response_mode,
            self.config.type_version,
        )?;
        Ok(())
    }

    /// Text shown after submitting, with placeholders expanded.
    pub fn completion_text(&self, evaluator: &dyn ExpressionEvaluator) -> Result<Option<String>, FormError> {
        self.config
            .form_submitted_text
            .as_deref()
            .map(|text| resolve_raw_data(text, evaluator))
            .transpose()
    }

    /// Map a submission into the record handed downstream.
    pub async fn submit(
        &self,
        input: SubmissionInput,
        mode: FormMode,
        clock: &dyn Clock,
    ) -> Result<OutputRecord, FormError> {
        let request = SubmissionRequest {
            payload: input.payload,
            query: input.query,
            source: self.source,
        };
        SubmissionMapper::new(self.storage.as_ref(), clock)
            .prepare_form_return_item(&request, &self.fields, mode, self.config.use_workflow_timezone)
            .await
    }
}

#[async_trait]
impl ExecutableNode for FormNode {
    #[instrument(skip(self, input, ctx), fields(node_id = %self.id, execution_id = %ctx.execution_id))]
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let input: SubmissionInput = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid form submission: {e}")))?;

        let mode = if ctx.test_run { FormMode::Test } else { FormMode::Production };
        let clock = SystemClock::new(ctx.timezone.clone());
        let record = self.submit(input, mode, &clock).await?;

        info!("form '{}' submitted with {} values", self.id, record.json.len());
        serde_json::to_value(&record).map_err(|e| NodeError::Fatal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forms::mock::{MockBinaryStorage, MockEvaluator, StaticGraph};
    use forms::{ConnectedNode, OutputValue, RenderShape, ResponseModeError};
    use serde_json::json;

    fn config(value: Value) -> FormConfig {
        serde_json::from_value(value).expect("valid form config")
    }

    fn contact_form() -> FormConfig {
        config(json!({
            "formTitle": "Contact",
            "formDescription": "<p>Say hi</p>",
            "formFields": [
                { "fieldLabel": "Name", "requiredField": true },
                { "fieldLabel": "Age", "fieldType": "number" },
                { "fieldLabel": "CV", "fieldType": "file", "multipleFiles": true }
            ],
            "formSubmittedText": "=Thanks {{ $json.Name }}"
        }))
    }

    fn node(config: FormConfig) -> FormNode {
        FormNode::new("Form", SubmissionSource::FormTrigger, config, Arc::new(MockBinaryStorage::new()))
            .expect("fields parse")
    }

    #[test]
    fn config_defaults() {
        let cfg = contact_form();
        assert_eq!(cfg.define_form, DefineForm::Fields);
        assert_eq!(cfg.response_mode, ResponseMode::OnReceived);
        assert!(cfg.append_attribution);
        assert_eq!(cfg.type_version, DEFAULT_FORM_VERSION);
    }

    #[test]
    fn json_defined_fields_are_parsed() {
        let cfg = config(json!({
            "formTitle": "T",
            "defineForm": "json",
            "jsonOutput": "[{\"fieldLabel\":\"Email\",\"fieldType\":\"email\"}]"
        }));
        let node = node(cfg);
        assert_eq!(node.fields().len(), 1);
        assert_eq!(node.fields()[0].label, "Email");
    }

    #[test]
    fn broken_json_fields_fail_construction() {
        let cfg = config(json!({ "formTitle": "T", "defineForm": "json", "jsonOutput": "[{" }));
        let result = FormNode::new("Form", SubmissionSource::FormTrigger, cfg, Arc::new(MockBinaryStorage::new()));
        assert!(matches!(result, Err(FormError::Schema(_))));
    }

    #[test]
    fn renders_page_with_query_defaults() {
        let node = node(contact_form());
        let model = node.render(
            BTreeMap::from([("Name".to_string(), "Ann".to_string())]),
            true,
            Some("inst-1"),
        );

        assert!(model.test_run);
        assert_eq!(model.form_description_metadata, "Say hi");
        assert_eq!(model.form_fields.len(), 3);
        assert_eq!(model.form_fields[0].default_value, "Ann");
        assert_eq!(model.form_fields[1].shape, RenderShape::Input { input_type: "number" });
        assert!(model.attribution_link.ends_with("&utm_campaign=inst-1"));
        assert_eq!(model.use_response_data, Some(false));
    }

    #[test]
    fn trigger_validates_against_graph_but_form_page_does_not() {
        let mut cfg = contact_form();
        cfg.response_mode = ResponseMode::ResponseNode;
        let graph = StaticGraph::new().with_children(
            "Form",
            vec![ConnectedNode { name: "Set".into(), node_type: "n8n-nodes-base.set".into(), type_version: 1.0 }],
        );

        let trigger = node(cfg.clone());
        assert!(matches!(
            trigger.validate(&graph),
            Err(FormError::ResponseMode(ResponseModeError::MissingRespondNode))
        ));

        let page = FormNode::new("Form", SubmissionSource::FormNode, cfg, Arc::new(MockBinaryStorage::new())).unwrap();
        assert!(page.validate(&graph).is_ok());
    }

    #[test]
    fn completion_text_is_resolved() {
        let node = node(contact_form());
        let evaluator = MockEvaluator::new().with("{{ $json.Name }}", json!("Ann"));
        assert_eq!(node.completion_text(&evaluator).unwrap().as_deref(), Some("Thanks Ann"));
    }

    #[tokio::test]
    async fn submit_maps_values_and_files() {
        let node = node(contact_form());
        let input: SubmissionInput = serde_json::from_value(json!({
            "data": { "field-0": " Ann ", "field-1": "abc" },
            "files": {
                "field-2": { "filepath": "/tmp/cv", "originalFilename": "cv.pdf", "newFilename": "x", "mimetype": "application/pdf", "size": 10 }
            },
            "query": { "ref": "mail" }
        }))
        .unwrap();
        let clock = SystemClock::default();

        let record = node.submit(input, FormMode::Test, &clock).await.unwrap();

        assert_eq!(record.json["Name"], OutputValue::Json(json!("Ann")));
        assert!(record.json["Age"].as_f64().is_some_and(f64::is_nan));
        assert_eq!(record.json["CV"].as_json().and_then(Value::as_array).map(Vec::len), Some(1));
        assert!(record.binary.contains_key("CV"));
        assert_eq!(record.json["formQueryParameters"], OutputValue::Json(json!({ "ref": "mail" })));
    }

    #[tokio::test]
    async fn execute_returns_output_json() {
        let node = node(contact_form());
        let mut ctx = ExecutionContext::new(uuid::Uuid::new_v4(), "UTC");
        ctx.test_run = true;

        let output = node
            .execute(json!({ "data": { "field-0": "Ann", "field-1": "7" } }), &ctx)
            .await
            .unwrap();

        assert_eq!(output["json"]["Name"], "Ann");
        assert_eq!(output["json"]["Age"], 7.0);
        assert_eq!(output["json"]["CV"], Value::Null);
        assert_eq!(output["json"]["formMode"], "test");
        assert!(output.get("binary").is_none());
    }

    #[tokio::test]
    async fn execute_rejects_malformed_input() {
        let node = node(contact_form());
        let ctx = ExecutionContext::new(uuid::Uuid::new_v4(), "UTC");
        let result = node.execute(json!({ "data": 5 }), &ctx).await;
        assert!(matches!(result, Err(NodeError::Fatal(msg)) if msg.contains("invalid form submission")));
    }

    #[tokio::test]
    async fn storage_failures_are_retryable() {
        let storage = Arc::new(MockBinaryStorage::new().failing_on("/tmp/cv"));
        let node = FormNode::new("Form", SubmissionSource::FormTrigger, contact_form(), storage).unwrap();
        let ctx = ExecutionContext::new(uuid::Uuid::new_v4(), "UTC");

        let result = node
            .execute(
                json!({ "files": { "field-2": [{ "filepath": "/tmp/cv", "originalFilename": "cv.pdf", "newFilename": "x", "mimetype": "application/pdf", "size": 1 }] } }),
                &ctx,
            )
            .await;

        assert!(matches!(result, Err(NodeError::Retryable(_))));
    }
}
