//! Handle to one triggered run.

use std::sync::{Arc, RwLock};

use crate::{
    Result, SeqflowError, ShareLock,
    common::Shutdown,
    model::TriggerEvent,
    runtime::ExecutionContext,
    utils,
};

pub type RunId = String;

/// Live view of a triggered run.
///
/// The engine hands one of these back from `trigger` and keeps it in
/// the run registry until the run completes. Once started, a run
/// proceeds to its terminal state; there is no mid-run abort.
pub struct Run {
    id: RunId,
    workflow_id: String,
    correlation_id: String,
    outcome: ShareLock<Option<Result<ExecutionContext>>>,
    completed: Shutdown,
}

impl Run {
    pub(crate) fn new(trigger: &TriggerEvent) -> Arc<Self> {
        Arc::new(Self {
            id: utils::longid(),
            workflow_id: trigger.workflow_id.clone(),
            correlation_id: trigger.correlation_id.clone(),
            outcome: Arc::new(RwLock::new(None)),
            completed: Shutdown::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn is_complete(&self) -> bool {
        self.completed.is_terminated()
    }

    /// Terminal outcome, `None` while the run is still executing.
    pub fn outcome(&self) -> Option<Result<ExecutionContext>> {
        self.outcome.read().unwrap().clone()
    }

    /// Wait for the run to finish and return its outcome.
    pub async fn wait(&self) -> Result<ExecutionContext> {
        self.completed.wait().await;
        match self.outcome() {
            Some(outcome) => outcome,
            None => Err(SeqflowError::Engine("run completed without an outcome".to_string())),
        }
    }

    /// Record the terminal outcome and release every waiter. Called
    /// exactly once, by the engine task driving the run.
    pub(crate) fn finish(
        &self,
        outcome: Result<ExecutionContext>,
    ) {
        *self.outcome.write().unwrap() = Some(outcome);
        self.completed.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_run() -> Arc<Run> {
        Run::new(&TriggerEvent::new("wf_1"))
    }

    #[tokio::test]
    async fn test_wait_returns_the_recorded_outcome() {
        let run = sample_run();
        assert!(!run.is_complete());
        assert!(run.outcome().is_none());

        let mut context = ExecutionContext::new();
        context.set("answer", json!(42));
        run.finish(Ok(context.clone()));

        assert!(run.is_complete());
        let outcome = run.wait().await.unwrap();
        assert_eq!(outcome, context);
    }

    #[tokio::test]
    async fn test_failed_outcome_is_preserved() {
        let run = sample_run();
        run.finish(Err(SeqflowError::Config("endpoint is required".to_string())));

        let err = run.wait().await.unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
    }

    #[test]
    fn test_run_identity_comes_from_the_trigger() {
        let trigger = TriggerEvent::new("wf_1");
        let run = Run::new(&trigger);

        assert_eq!(run.workflow_id(), "wf_1");
        assert_eq!(run.correlation_id(), trigger.correlation_id);
        assert!(!run.id().is_empty());
    }
}
