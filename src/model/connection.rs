use serde::{Deserialize, Serialize};

/// Directed edge between two nodes of the same workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionModel {
    /// Row id; deploy assigns one when the editor left it empty.
    #[serde(default)]
    pub id: String,
    pub from_node_id: String,
    pub to_node_id: String,
}

impl ConnectionModel {
    pub fn new(from_node_id: impl Into<String>, to_node_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            from_node_id: from_node_id.into(),
            to_node_id: to_node_id.into(),
        }
    }
}
