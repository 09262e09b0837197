use serde::{Deserialize, Serialize};

use crate::{
    Result, SeqflowError,
    model::{ConnectionModel, NodeModel},
};

/// Deploy format of a workflow: the graph plus its owner.
///
/// `user_id` scopes credential lookups for every run of the workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowModel {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub connections: Vec<ConnectionModel>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let workflow = serde_json::from_str::<WorkflowModel>(s);
        match workflow {
            Ok(v) => Ok(v),
            Err(e) => Err(SeqflowError::Workflow(format!("{}", e))),
        }
    }
}
