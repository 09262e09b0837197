use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Lifecycle of one execution record. Created RUNNING, finalized
/// exactly once to SUCCESS or FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// One run of a workflow: the durable anchor observability reads.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    /// Correlation id of the triggering event, unique per run.
    pub event_id: String,
    pub status: String,
    pub started_at: i64,
    /// Millisecond timestamp, 0 while the run is still open.
    pub completed_at: i64,
    /// Final context as JSON text, set on success.
    pub output: Option<String>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
}

impl DbCollectionIden for Execution {
    fn iden() -> StoreIden {
        StoreIden::Executions
    }
}
