//! Whole-workflow validation run before a workflow is activated.

use forms::{validate_response_mode_configuration, ResponseMode, FORM_TRIGGER_NODE_TYPE};
use tracing::info;

use crate::{graph::WorkflowGraph, EngineError, Workflow};

/// Validate the graph and every form trigger's response mode.
///
/// Returns the execution order on success.
pub fn validate_workflow(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    let graph = WorkflowGraph::new(workflow)?;
    let order = graph.execution_order()?;

    for node in workflow.nodes_of_type(FORM_TRIGGER_NODE_TYPE) {
        let mode = response_mode_parameter(&node.id, &node.parameters)?;
        validate_response_mode_configuration(&graph, &node.id, mode, node.type_version)
            .map_err(|source| EngineError::ResponseMode {
                node_id: node.id.clone(),
                source,
            })?;
    }

    info!(
        "workflow '{}' validated ({} nodes)",
        workflow.name,
        order.len()
    );
    Ok(order)
}

/// `responseMode` parameter of a node, `onReceived` when unset.
pub fn response_mode_parameter(
    node_id: &str,
    parameters: &serde_json::Value,
) -> Result<ResponseMode, EngineError> {
    match parameters.get("responseMode") {
        None | Some(serde_json::Value::Null) => Ok(ResponseMode::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            EngineError::InvalidParameter {
                node_id: node_id.to_string(),
                message: format!("responseMode: {e}"),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, NodeDefinition};
    use forms::ResponseModeError;
    use serde_json::json;

    fn form_workflow(mode: &str, version: f64, with_respond: bool) -> Workflow {
        let mut nodes = vec![
            NodeDefinition::new("Form", FORM_TRIGGER_NODE_TYPE)
                .with_version(version)
                .with_parameters(json!({ "responseMode": mode })),
            NodeDefinition::new("Set", "n8n-nodes-base.set"),
        ];
        let mut edges = vec![Edge { from: "Form".into(), to: "Set".into() }];
        if with_respond {
            nodes.push(NodeDefinition::new("Respond", "n8n-nodes-base.respondToWebhook"));
            edges.push(Edge { from: "Set".into(), to: "Respond".into() });
        }
        Workflow::new("form flow", nodes, edges)
    }

    #[test]
    fn consistent_form_workflow_is_valid() {
        let order = validate_workflow(&form_workflow("onReceived", 2.2, false)).unwrap();
        assert_eq!(order, vec!["Form", "Set"]);
        assert!(validate_workflow(&form_workflow("responseNode", 2.0, true)).is_ok());
    }

    #[test]
    fn respond_node_found_transitively() {
        let err = validate_workflow(&form_workflow("lastNode", 2.0, true)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ResponseMode {
                node_id,
                source: ResponseModeError::RespondNodeMismatch { .. },
            } if node_id == "Form"
        ));
    }

    #[test]
    fn missing_respond_node_is_reported() {
        let err = validate_workflow(&form_workflow("responseNode", 2.0, false)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ResponseMode { source: ResponseModeError::MissingRespondNode, .. }
        ));
    }

    #[test]
    fn unknown_response_mode_is_an_invalid_parameter() {
        let err = validate_workflow(&form_workflow("whenever", 2.0, false)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    #[test]
    fn missing_response_mode_defaults_to_on_received() {
        assert_eq!(response_mode_parameter("n", &json!({})).unwrap(), ResponseMode::OnReceived);
        assert_eq!(
            response_mode_parameter("n", &serde_json::Value::Null).unwrap(),
            ResponseMode::OnReceived
        );
    }
}
