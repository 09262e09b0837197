use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

/// The closed set of node types the engine understands.
///
/// Adding a type means adding a variant here, a config struct and an
/// executor; the compiler walks every dispatch site.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NodeType {
    /// Editor-only placeholder shown on a fresh canvas. It has no
    /// executor; reaching it at run time is a configuration error.
    #[default]
    Initial,
    ManualTrigger,
    GoogleFormTrigger,
    HttpRequest,
    EditFields,
    Openai,
    Anthropic,
    Gemini,
}

impl NodeType {
    /// Name of the realtime channel carrying this node type's `status`
    /// topic.
    pub fn channel(&self) -> String {
        format!("{}-execution", self.as_ref())
    }
}

/// Persisted form of a node. `data` holds the type-specific
/// configuration exactly as the editor saved it, possibly `{}` for a
/// freshly placed node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeModel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub name: String,
    #[serde(default = "empty_data")]
    pub data: Value,
}

fn empty_data() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_wire_names() {
        assert_eq!(NodeType::ManualTrigger.as_ref(), "manual-trigger");
        assert_eq!(NodeType::HttpRequest.as_ref(), "http-request");
        assert_eq!(NodeType::Openai.as_ref(), "openai");
        assert_eq!(NodeType::Initial.as_ref(), "initial");
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(NodeType::EditFields.channel(), "edit-fields-execution");
        assert_eq!(NodeType::GoogleFormTrigger.channel(), "google-form-trigger-execution");
        assert_eq!(NodeType::Anthropic.channel(), "anthropic-execution");
    }

    #[test]
    fn test_node_model_deserialize_defaults_data() {
        let node: NodeModel = serde_json::from_str(r#"{"id": "n1", "type": "manual-trigger"}"#)
            .expect("node should deserialize");
        assert_eq!(node.kind, NodeType::ManualTrigger);
        assert!(node.data.as_object().is_some_and(|m| m.is_empty()));
    }
}
