use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Result, SeqflowError};

/// Payload that starts a run.
///
/// `correlation_id` is the external event id; execution histories are
/// keyed by `(workflow_id, correlation_id)` so retries of the same
/// event converge on one history row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub workflow_id: String,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<Map<String, Value>>,
}

impl TriggerEvent {
    /// Trigger with a freshly generated correlation id.
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            correlation_id: Uuid::new_v4().to_string(),
            initial_data: None,
        }
    }

    pub fn with_initial_data(mut self, data: Map<String, Value>) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Both ids must be present before a run is created; a trigger
    /// without them has nothing to retry against.
    pub fn validate(&self) -> Result<()> {
        if self.workflow_id.trim().is_empty() {
            return Err(SeqflowError::Config("workflow id is required to execute a workflow".to_string()));
        }
        if self.correlation_id.trim().is_empty() {
            return Err(SeqflowError::Config("correlation id is required to execute a workflow".to_string()));
        }
        Ok(())
    }
}
