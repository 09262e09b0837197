//! Trigger node executors.
//!
//! Triggers mark where a workflow starts. They carry no configuration
//! and pass the context through unchanged; the run's initial data has
//! already been seeded into the context by the runner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    runtime::ExecutionContext,
    workflow::executors::{ExecutorInput, NodeExecutor},
};

const MANUAL_TRIGGER_STEP: &str = "manual-trigger";
const GOOGLE_FORM_TRIGGER_STEP: &str = "google-form-trigger";

/// Marks the workflow as startable interactively. At most one of
/// these per workflow, enforced at deploy time.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ManualTriggerAction {}

/// Start point for form-submission runs. The submission payload
/// arrives as the trigger event's initial data.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GoogleFormTriggerAction {}

async fn pass_through(
    step_name: &str,
    input: ExecutorInput<'_>,
) -> Result<ExecutionContext> {
    // The step snapshots the context, so a retried run resumes from
    // the same starting point the first attempt saw.
    let snapshot = input.context.to_value();
    let result = input.steps.run(step_name, Box::pin(async move { Ok(snapshot) })).await?;
    Ok(serde_json::from_value(result)?)
}

#[async_trait]
impl NodeExecutor for ManualTriggerAction {
    fn create(params: serde_json::Value) -> Result<Self> {
        let schema = Self::schema();
        jsonschema::validate(&schema, &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object"
        })
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<ExecutionContext> {
        pass_through(MANUAL_TRIGGER_STEP, input).await
    }
}

#[async_trait]
impl NodeExecutor for GoogleFormTriggerAction {
    fn create(params: serde_json::Value) -> Result<Self> {
        let schema = Self::schema();
        jsonschema::validate(&schema, &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object"
        })
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<ExecutionContext> {
        pass_through(GOOGLE_FORM_TRIGGER_STEP, input).await
    }
}
