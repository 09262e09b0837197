//! The engine - the main entry point for Seqflow.
//!
//! The engine owns the tokio runtime, the status channel, and the
//! store. Workflows are deployed into the store, then triggered;
//! every trigger becomes a [`Run`] that executes on the runtime while
//! the caller holds a handle to poll or await.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::{
    Config, Result, SeqflowError, StoreType,
    common::{MemCache, Queue, Shutdown},
    config::RetryConfig,
    events::StatusPublisher,
    model::{NodeType, TriggerEvent, WorkflowModel},
    runtime::{Channel, ChannelSubscription, NodeStatusWatch, Run, RunId, SubscribeOptions, WorkflowRunner},
    secrets::{Base64Cipher, CredentialCipher},
    store::{DbStore, MemStore, PostgresStore, Store},
    workflow::executors::ExecEnv,
};

/// Maximum number of run handles to keep in memory.
const RUN_CACHE_SIZE: usize = 2048;
/// Size of the queue for completed-run notifications.
const RUN_COMPLETE_QUEUE_SIZE: usize = 100;

/// The workflow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Engine::new_with_config(Config::default());
/// engine.launch();
///
/// engine.deploy(&workflow_model)?;
/// let run = engine.trigger(TriggerEvent::new(&workflow_model.id))?;
/// let context = run.wait().await?;
///
/// engine.shutdown();
/// ```
pub struct Engine {
    /// Broadcast channel for node status events.
    channel: Arc<Channel>,
    /// Persistent storage for workflows and execution history.
    store: Arc<Store>,
    /// Shared services handed to executors.
    env: ExecEnv,
    /// Whole-run retry policy applied to every trigger.
    retry: RetryConfig,
    /// Queue for completed-run notifications.
    runs_complete_queue: Arc<Queue<RunId>>,
    /// Registry of live run handles.
    runs: Arc<MemCache<RunId, Arc<Run>>>,

    running: Arc<AtomicBool>,
    runtime: Arc<Runtime>,
    shutdown: Arc<Shutdown>,
}

impl Engine {
    /// Creates a new engine with the given configuration and a fresh
    /// runtime, using the default credential codec.
    pub fn new_with_config(config: Config) -> Self {
        let runtime = Arc::new(Builder::new_multi_thread().worker_threads(config.async_worker_thread_number.into()).enable_all().build().unwrap());
        Self::new(config, runtime, Arc::new(Base64Cipher))
    }

    pub(crate) fn new(
        config: Config,
        runtime: Arc<Runtime>,
        cipher: Arc<dyn CredentialCipher>,
    ) -> Self {
        let store = Store::new();
        let db: Box<dyn DbStore> = match config.store.store_type {
            StoreType::Mem => Box::new(MemStore::new()),
            StoreType::Postgres => {
                let postgres = PostgresStore::new(
                    &config.store.postgres.expect("Postgres configuration is required when store type is Postgres").database_url,
                    runtime.clone(),
                );
                Box::new(postgres)
            }
        };
        db.init(&store);

        let store = Arc::new(store);
        let channel = Arc::new(Channel::new(runtime.clone()));
        let env = ExecEnv::new(store.clone(), cipher, std::time::Duration::from_millis(config.http_timeout_ms));

        Self {
            channel,
            store,
            env,
            retry: config.retry,
            runs_complete_queue: Queue::new(RUN_COMPLETE_QUEUE_SIZE),
            runs: Arc::new(MemCache::new(RUN_CACHE_SIZE)),
            running: Arc::new(AtomicBool::new(false)),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Starts the engine: begins dispatching status events and evicting
    /// completed runs from the registry.
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            return;
        }

        self.channel.listen();

        let runs_complete_queue = self.runs_complete_queue.clone();
        let shutdown = self.shutdown.clone();
        let runs = self.runs.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(run_id) = runs_complete_queue.next_async() => {
                        runs.remove(&run_id);
                    }
                }
            }
        });
    }

    /// Gracefully shuts down the engine. In-flight runs proceed to
    /// their terminal state; no new triggers are accepted.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        self.shutdown.shutdown();
        self.channel.shutdown();
    }

    /// Deploys a workflow definition to the store after validating its
    /// shape. The graph itself (cycles, orphans) is checked at trigger
    /// time; deploy only rejects definitions that can never run.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        let trigger_count = workflow.nodes.iter().filter(|n| n.kind == NodeType::ManualTrigger).count();
        if trigger_count > 1 {
            return Err(SeqflowError::Config(format!("workflow '{}' holds {} manual triggers, at most one is allowed", workflow.id, trigger_count)));
        }

        for connection in &workflow.connections {
            for endpoint in [&connection.from_node_id, &connection.to_node_id] {
                if !workflow.nodes.iter().any(|n| &n.id == endpoint) {
                    return Err(SeqflowError::Config(format!("connection references unknown node '{}'", endpoint)));
                }
            }
        }

        info!(workflow = workflow.id.as_str(), "deploying workflow");
        self.store.deploy(workflow)
    }

    /// Starts a run for `trigger` and returns its handle.
    ///
    /// The run executes on the engine runtime; the handle resolves
    /// once it reaches its terminal state.
    pub fn trigger(
        &self,
        trigger: TriggerEvent,
    ) -> Result<Arc<Run>> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(SeqflowError::Engine("engine is not running".to_string()));
        }
        trigger.validate()?;

        let run = Run::new(&trigger);
        self.runs.set(run.id().to_string(), run.clone());

        let runner = WorkflowRunner::new(self.env.clone(), self.channel.clone() as Arc<dyn StatusPublisher>, self.retry.clone());
        let runs_complete_queue = self.runs_complete_queue.clone();
        let handle = run.clone();
        self.runtime.spawn(async move {
            let outcome = runner.execute(&trigger).await;
            handle.finish(outcome);
            let _ = runs_complete_queue.send_async(handle.id().to_string()).await;
        });

        Ok(run)
    }

    /// Filtered view over the status channel.
    pub fn subscribe(
        &self,
        options: SubscribeOptions,
    ) -> ChannelSubscription {
        ChannelSubscription::new(self.channel.clone(), options)
    }

    /// Latest-status fold over one node.
    pub fn watch(
        &self,
        node_id: impl Into<String>,
    ) -> NodeStatusWatch {
        NodeStatusWatch::watch(self.channel.clone(), node_id)
    }

    /// Gets a live run handle by its ID. Completed runs are evicted
    /// shortly after they finish.
    pub fn get_run(
        &self,
        run_id: &str,
    ) -> Option<Arc<Run>> {
        self.runs.get(&run_id.to_string())
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use serde_json::json;

    use super::*;
    use crate::{runtime::ExecutionContext, store::query::Query};

    fn launch_engine() -> Engine {
        let engine = Engine::new_with_config(Config::default());
        engine.launch();
        engine
    }

    fn deploy(
        engine: &Engine,
        workflow: serde_json::Value,
    ) {
        let model: WorkflowModel = serde_json::from_value(workflow).unwrap();
        engine.deploy(&model).unwrap();
    }

    fn wait_complete(run: &Run) -> Result<ExecutionContext> {
        for _ in 0..100 {
            if run.is_complete() {
                return run.outcome().unwrap();
            }
            thread::sleep(Duration::from_millis(50));
        }
        panic!("run did not complete in time");
    }

    fn two_node_workflow() -> serde_json::Value {
        json!({
            "id": "w1",
            "userId": "u1",
            "name": "greet",
            "nodes": [
                {"id": "start", "type": "manual-trigger", "data": {}},
                {"id": "fields", "type": "edit-fields", "data": {
                    "fields": [{"name": "greeting", "type": "string", "value": "hello"}]
                }}
            ],
            "connections": [{"fromNodeId": "start", "toNodeId": "fields"}]
        })
    }

    #[test]
    fn test_trigger_runs_workflow_to_completion() {
        let engine = launch_engine();
        deploy(&engine, two_node_workflow());

        let run = engine.trigger(TriggerEvent::new("w1")).unwrap();
        let context = wait_complete(&run).unwrap();
        assert_eq!(context.get("greeting"), Some(&json!("hello")));

        let rows = engine.store().executions().query(&Query::new().push_filter("workflow_id", "w1")).unwrap();
        assert_eq!(rows.count, 1);
        assert_eq!(rows.rows[0].status, "SUCCESS");

        engine.shutdown();
    }

    #[test]
    fn test_completed_runs_are_evicted() {
        let engine = launch_engine();
        deploy(&engine, two_node_workflow());

        let run = engine.trigger(TriggerEvent::new("w1")).unwrap();
        let run_id = run.id().to_string();
        assert!(engine.get_run(&run_id).is_some());

        wait_complete(&run).unwrap();
        // eviction runs on the engine runtime after completion
        for _ in 0..100 {
            if engine.get_run(&run_id).is_none() {
                engine.shutdown();
                return;
            }
            thread::sleep(Duration::from_millis(50));
        }
        panic!("completed run was not evicted");
    }

    #[test]
    fn test_trigger_requires_running_engine() {
        let engine = Engine::new_with_config(Config::default());

        let err = engine.trigger(TriggerEvent::new("w1")).err().unwrap();
        assert!(matches!(err, SeqflowError::Engine(_)));
    }

    #[test]
    fn test_deploy_rejects_two_manual_triggers() {
        let engine = launch_engine();

        let model: WorkflowModel = serde_json::from_value(json!({
            "id": "w1",
            "userId": "u1",
            "name": "double start",
            "nodes": [
                {"id": "a", "type": "manual-trigger", "data": {}},
                {"id": "b", "type": "manual-trigger", "data": {}}
            ],
            "connections": []
        }))
        .unwrap();

        let err = engine.deploy(&model).unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
        engine.shutdown();
    }

    #[test]
    fn test_deploy_rejects_dangling_connection() {
        let engine = launch_engine();

        let model: WorkflowModel = serde_json::from_value(json!({
            "id": "w1",
            "userId": "u1",
            "name": "dangling",
            "nodes": [{"id": "a", "type": "manual-trigger", "data": {}}],
            "connections": [{"fromNodeId": "a", "toNodeId": "ghost"}]
        }))
        .unwrap();

        let err = engine.deploy(&model).unwrap_err();
        assert!(err.to_string().contains("ghost"));
        engine.shutdown();
    }

    #[test]
    fn test_failed_run_reports_through_the_handle() {
        let engine = launch_engine();
        deploy(
            &engine,
            json!({
                "id": "w1",
                "userId": "u1",
                "name": "bad number",
                "nodes": [
                    {"id": "start", "type": "manual-trigger", "data": {}},
                    {"id": "bad", "type": "edit-fields", "data": {
                        "fields": [{"name": "n", "type": "number", "value": "abc"}]
                    }}
                ],
                "connections": [{"fromNodeId": "start", "toNodeId": "bad"}]
            }),
        );

        let run = engine.trigger(TriggerEvent::new("w1")).unwrap();
        let err = wait_complete(&run).unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
        engine.shutdown();
    }

    #[test]
    fn test_subscription_observes_run_statuses() {
        let engine = launch_engine();
        deploy(&engine, two_node_workflow());

        let (tx, rx) = flume::unbounded();
        engine.subscribe(SubscribeOptions::with_node("fields".to_string())).on_status(move |m| {
            let _ = tx.send(m.status);
        });

        let run = engine.trigger(TriggerEvent::new("w1")).unwrap();
        wait_complete(&run).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, crate::events::NodeStatus::Loading);
        assert_eq!(second, crate::events::NodeStatus::Success);
        engine.shutdown();
    }
}
