//! Response-mode validation.
//!
//! A form can answer the submitting browser itself or hand that job to a
//! downstream "Respond to Webhook" node. The two settings must agree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ConnectedNode, WorkflowGraphInspector};
use crate::ResponseModeError;

/// Node type that answers a webhook request explicitly.
pub const RESPOND_TO_WEBHOOK_NODE_TYPE: &str = "n8n-nodes-base.respondToWebhook";

/// Last form version that still allows a respond node downstream.
pub const LAST_VERSION_WITH_RESPOND_NODE: f64 = 2.1;

/// The form's "Respond When" setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseMode {
    /// Answer as soon as the submission arrives.
    #[default]
    OnReceived,
    /// Answer when the last node of the workflow finishes.
    LastNode,
    /// A downstream respond node produces the answer.
    ResponseNode,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnReceived => write!(f, "onReceived"),
            Self::LastNode => write!(f, "lastNode"),
            Self::ResponseNode => write!(f, "responseNode"),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onReceived"   => Ok(Self::OnReceived),
            "lastNode"     => Ok(Self::LastNode),
            "responseNode" => Ok(Self::ResponseNode),
            other          => Err(format!("unknown response mode: {other}")),
        }
    }
}

/// Check `mode` against the nodes connected downstream of `node_name`.
///
/// # Errors
/// - [`ResponseModeError::MissingRespondNode`] when the mode expects a respond
///   node and none is connected.
/// - [`ResponseModeError::RespondNodeMismatch`] when a respond node is
///   connected to a form at version 2.1 or older that answers by itself.
/// - [`ResponseModeError::RespondNodeUnsupported`] when a respond node is
///   connected to a newer form.
pub fn validate_response_mode(
    mode: ResponseMode,
    connected: &[ConnectedNode],
    node_version: f64,
    node_name: &str,
) -> Result<(), ResponseModeError> {
    let respond_node_connected = connected
        .iter()
        .any(|node| node.node_type == RESPOND_TO_WEBHOOK_NODE_TYPE);

    debug!(
        %mode, node_version, respond_node_connected,
        "validating response mode of '{}'", node_name
    );

    if !respond_node_connected && mode == ResponseMode::ResponseNode {
        return Err(ResponseModeError::MissingRespondNode);
    }

    if respond_node_connected
        && mode != ResponseMode::ResponseNode
        && node_version <= LAST_VERSION_WITH_RESPOND_NODE
    {
        return Err(ResponseModeError::RespondNodeMismatch {
            node_name: node_name.to_string(),
        });
    }

    if respond_node_connected && node_version > LAST_VERSION_WITH_RESPOND_NODE {
        return Err(ResponseModeError::RespondNodeUnsupported);
    }

    Ok(())
}

/// [`validate_response_mode`] against the live workflow graph.
pub fn validate_response_mode_configuration(
    graph: &dyn WorkflowGraphInspector,
    node_name: &str,
    mode: ResponseMode,
    node_version: f64,
) -> Result<(), ResponseModeError> {
    let connected = graph.connected_nodes(node_name);
    validate_response_mode(mode, &connected, node_version, node_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::StaticGraph;

    fn respond_node() -> ConnectedNode {
        ConnectedNode {
            name: "Respond".into(),
            node_type: RESPOND_TO_WEBHOOK_NODE_TYPE.into(),
            type_version: 1.0,
        }
    }

    fn other_node() -> ConnectedNode {
        ConnectedNode {
            name: "Set".into(),
            node_type: "n8n-nodes-base.set".into(),
            type_version: 3.0,
        }
    }

    #[test]
    fn response_node_mode_requires_a_respond_node() {
        assert_eq!(
            validate_response_mode(ResponseMode::ResponseNode, &[other_node()], 2.0, "Form"),
            Err(ResponseModeError::MissingRespondNode)
        );
    }

    #[test]
    fn on_received_without_respond_node_is_valid() {
        assert_eq!(validate_response_mode(ResponseMode::OnReceived, &[], 2.2, "Form"), Ok(()));
        assert_eq!(
            validate_response_mode(ResponseMode::LastNode, &[other_node()], 1.0, "Form"),
            Ok(())
        );
    }

    #[test]
    fn respond_node_with_other_mode_is_a_mismatch_up_to_2_1() {
        let err = validate_response_mode(ResponseMode::OnReceived, &[respond_node()], 2.1, "Form")
            .unwrap_err();
        assert_eq!(err, ResponseModeError::RespondNodeMismatch { node_name: "Form".into() });
        assert_eq!(err.to_string(), "Form node not correctly configured");
        assert!(err.description().contains("Respond When"));
    }

    #[test]
    fn respond_node_with_response_node_mode_is_valid_up_to_2_1() {
        assert_eq!(
            validate_response_mode(ResponseMode::ResponseNode, &[respond_node()], 2.0, "Form"),
            Ok(())
        );
    }

    #[test]
    fn respond_node_is_unsupported_after_2_1() {
        for mode in [ResponseMode::ResponseNode, ResponseMode::OnReceived] {
            assert_eq!(
                validate_response_mode(mode, &[respond_node()], 2.2, "Form"),
                Err(ResponseModeError::RespondNodeUnsupported)
            );
        }
    }

    #[test]
    fn validates_through_graph_inspector() {
        let graph = StaticGraph::new().with_children("Form", vec![other_node(), respond_node()]);
        assert_eq!(
            validate_response_mode_configuration(&graph, "Form", ResponseMode::ResponseNode, 2.0),
            Ok(())
        );
        assert_eq!(
            validate_response_mode_configuration(&graph, "Other", ResponseMode::ResponseNode, 2.0),
            Err(ResponseModeError::MissingRespondNode)
        );
    }

    #[test]
    fn response_mode_round_trips_through_strings() {
        assert_eq!("responseNode".parse::<ResponseMode>(), Ok(ResponseMode::ResponseNode));
        assert_eq!(ResponseMode::LastNode.to_string(), "lastNode");
        assert!("never".parse::<ResponseMode>().is_err());
    }
}
