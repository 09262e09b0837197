//! The run state machine.
//!
//! One `WorkflowRunner::execute` call takes a trigger from validation
//! to its terminal state: it anchors the execution history row, loads
//! and orders the graph through a durable prepare step, walks the
//! nodes strictly sequentially, delivers status events around each
//! node, and applies the whole-run retry budget for transient
//! failures. Executors never see the event transport and never decide
//! retriability; both live here.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    Result, SeqflowError,
    config::RetryConfig,
    events::{NodeStatus, StatusMessage, StatusPublisher},
    model::{NodeModel, TriggerEvent},
    runtime::{ExecutionContext, MemoStepRunner, StepRunner},
    store::{
        data::{Execution, ExecutionStatus},
        query::Query,
    },
    utils,
    workflow::{
        executors::{ExecEnv, ExecutorInput, NodeAction},
        plan,
    },
};

const PREPARE_STEP: &str = "prepare-workflow";

/// Executes one trigger end to end.
pub struct WorkflowRunner {
    env: ExecEnv,
    publisher: Arc<dyn StatusPublisher>,
    retry: RetryConfig,
}

/// What the prepare step pins down for the rest of the run. Memoized,
/// so every retry attempt replays the same order and owner.
#[derive(Serialize, Deserialize)]
struct PreparedRun {
    user_id: String,
    nodes: Vec<NodeModel>,
}

impl WorkflowRunner {
    pub fn new(
        env: ExecEnv,
        publisher: Arc<dyn StatusPublisher>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            env,
            publisher,
            retry,
        }
    }

    /// Runs the workflow named by `trigger` to its terminal state and
    /// returns the final context.
    ///
    /// An invalid trigger fails before the history row exists; every
    /// later failure lands in that row as the terminal FAILED update.
    pub async fn execute(
        &self,
        trigger: &TriggerEvent,
    ) -> Result<ExecutionContext> {
        trigger.validate()?;

        let history_id = self.open_history(trigger)?;
        info!(
            workflow = trigger.workflow_id.as_str(),
            event = trigger.correlation_id.as_str(),
            "run started"
        );

        let steps = MemoStepRunner::new();
        let mut attempt: u64 = 0;
        loop {
            steps.begin_attempt();
            match self.attempt(trigger, &steps).await {
                Ok(context) => {
                    self.finalize(&history_id, ExecutionStatus::Success, Some(context.to_json()), None)?;
                    info!(workflow = trigger.workflow_id.as_str(), "run succeeded");
                    return Ok(context);
                }
                Err(err) if err.is_retriable() && attempt < self.retry.times => {
                    attempt += 1;
                    warn!(
                        workflow = trigger.workflow_id.as_str(),
                        attempt,
                        error = %err,
                        "transient failure, retrying run"
                    );
                    if self.retry.interval_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.retry.interval_ms)).await;
                    }
                }
                Err(err) => {
                    self.finalize(&history_id, ExecutionStatus::Failed, None, Some(&err))?;
                    error!(workflow = trigger.workflow_id.as_str(), error = %err, "run failed");
                    return Err(err);
                }
            }
        }
    }

    /// One pass over the graph. Retried attempts re-enter here with
    /// the same step runner, so completed steps replay from the memo.
    async fn attempt(
        &self,
        trigger: &TriggerEvent,
        steps: &MemoStepRunner,
    ) -> Result<ExecutionContext> {
        let store = self.env.store.clone();
        let workflow_id = trigger.workflow_id.clone();
        let prepared = steps
            .run(
                PREPARE_STEP,
                Box::pin(async move {
                    let workflow = store.load_workflow(&workflow_id)?;
                    let ordered = plan::execution_order(workflow.nodes, &workflow.connections)?;
                    Ok(serde_json::to_value(PreparedRun {
                        user_id: workflow.user_id,
                        nodes: ordered,
                    })?)
                }),
            )
            .await?;
        let prepared: PreparedRun = serde_json::from_value(prepared)?;

        let mut context = match &trigger.initial_data {
            Some(map) => ExecutionContext::from_map(map.clone()),
            None => ExecutionContext::new(),
        };

        for node in &prepared.nodes {
            let channel = node.kind.channel();
            self.publisher.publish(StatusMessage::new(channel.as_str(), node.id.as_str(), NodeStatus::Loading));

            // Parse failures take the same error path as execution
            // failures so observers always see loading -> error.
            let outcome = match NodeAction::parse(node.kind, node.data.clone()) {
                Ok(action) => {
                    action
                        .execute(ExecutorInput {
                            node_id: &node.id,
                            user_id: &prepared.user_id,
                            context: context.clone(),
                            steps,
                            env: &self.env,
                        })
                        .await
                }
                Err(err) => Err(err),
            };

            match outcome {
                Ok(next) => {
                    self.publisher.publish(StatusMessage::new(channel.as_str(), node.id.as_str(), NodeStatus::Success));
                    context = next;
                }
                Err(err) => {
                    self.publisher.publish(StatusMessage::new(channel.as_str(), node.id.as_str(), NodeStatus::Error));
                    return Err(err);
                }
            }
        }

        Ok(context)
    }

    /// Find-or-create the RUNNING history row keyed by
    /// `(workflowId, eventId)`. A whole-run retry of the same event
    /// converges on the row the first attempt created.
    fn open_history(
        &self,
        trigger: &TriggerEvent,
    ) -> Result<String> {
        let executions = self.env.store.executions();

        let existing = executions.query(
            &Query::new()
                .push_filter("workflow_id", trigger.workflow_id.clone())
                .push_filter("event_id", trigger.correlation_id.clone()),
        )?;
        if let Some(row) = existing.rows.into_iter().next() {
            return Ok(row.id);
        }

        let row = Execution {
            id: utils::longid(),
            workflow_id: trigger.workflow_id.clone(),
            event_id: trigger.correlation_id.clone(),
            status: ExecutionStatus::Running.to_string(),
            started_at: utils::time::time_millis(),
            completed_at: 0,
            output: None,
            error: None,
            error_stack: None,
        };
        executions.create(&row)?;
        Ok(row.id)
    }

    /// The single terminal update of the history row.
    fn finalize(
        &self,
        history_id: &str,
        status: ExecutionStatus,
        output: Option<String>,
        err: Option<&SeqflowError>,
    ) -> Result<()> {
        let executions = self.env.store.executions();
        let mut row = executions.find(history_id)?;

        row.status = status.to_string();
        row.completed_at = utils::time::time_millis();
        row.output = output;
        if let Some(err) = err {
            row.error = Some(err.to_string());
            row.error_stack = Some(format!("{:?}", err));
        }

        executions.update(&row)?;
        Ok(())
    }
}
