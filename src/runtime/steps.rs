//! Durable steps.
//!
//! Executors run their side effects through a step runner. Results
//! memoize per run, so a retried run replays finished work instead of
//! redoing it.

use std::{
    collections::HashMap,
    sync::RwLock,
    time::Instant,
};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::{Result, common::MemCache};

/// Work a step performs, type-erased to JSON so results can memoize.
pub type StepFuture = BoxFuture<'static, Result<Value>>;

/// Telemetry identifying an AI provider call wrapped as a step.
#[derive(Debug, Clone)]
pub struct AiCallMeta {
    pub provider: String,
    pub model: String,
}

/// Durable step execution as consumed by node executors.
///
/// `run` memoizes by step name and occurrence: the n-th step with a
/// given name in an attempt reuses the result the n-th such step
/// produced in an earlier attempt. Strictly sequential execution makes
/// that replay deterministic.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(
        &self,
        name: &str,
        work: StepFuture,
    ) -> Result<Value>;

    /// Specialization for AI provider calls: same memoization, plus
    /// latency/model telemetry around the call.
    async fn run_ai(
        &self,
        name: &str,
        meta: &AiCallMeta,
        work: StepFuture,
    ) -> Result<Value>;
}

/// In-memory [`StepRunner`] scoped to one run.
///
/// Memo entries are keyed `name#occurrence`. `begin_attempt` resets the
/// occurrence counters while keeping the memo, which is exactly what
/// lines replayed steps up with their earlier results. Failed steps
/// are not memoized and so execute again on the next attempt.
pub struct MemoStepRunner {
    memo: MemCache<String, Value>,
    counters: RwLock<HashMap<String, u64>>,
    executed: RwLock<HashMap<String, u64>>,
}

impl MemoStepRunner {
    pub fn new() -> Self {
        Self {
            memo: MemCache::new(1024),
            counters: RwLock::new(HashMap::new()),
            executed: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new attempt: occurrence counters restart, memoized
    /// results survive.
    pub fn begin_attempt(&self) {
        self.counters.write().unwrap().clear();
    }

    /// How many times the named step actually executed (replays not
    /// counted). Useful to observe resume behavior.
    pub fn executed_count(
        &self,
        name: &str,
    ) -> u64 {
        self.executed.read().unwrap().get(name).copied().unwrap_or(0)
    }

    fn next_key(
        &self,
        name: &str,
    ) -> String {
        let mut counters = self.counters.write().unwrap();
        let counter = counters.entry(name.to_string()).or_insert(0);
        let key = format!("{}#{}", name, counter);
        *counter += 1;
        key
    }

    async fn run_inner(
        &self,
        name: &str,
        work: StepFuture,
    ) -> Result<Value> {
        let key = self.next_key(name);

        if let Some(value) = self.memo.get(&key) {
            debug!(step = key.as_str(), "step replayed from memo");
            return Ok(value);
        }

        let value = work.await?;
        self.memo.set(key, value.clone());
        *self.executed.write().unwrap().entry(name.to_string()).or_insert(0) += 1;
        Ok(value)
    }
}

impl Default for MemoStepRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for MemoStepRunner {
    async fn run(
        &self,
        name: &str,
        work: StepFuture,
    ) -> Result<Value> {
        self.run_inner(name, work).await
    }

    async fn run_ai(
        &self,
        name: &str,
        meta: &AiCallMeta,
        work: StepFuture,
    ) -> Result<Value> {
        let started = Instant::now();
        let result = self.run_inner(name, work).await;
        debug!(
            step = name,
            provider = meta.provider.as_str(),
            model = meta.model.as_str(),
            latency_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "ai step finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use serde_json::json;

    use super::*;
    use crate::SeqflowError;

    fn counting_step(
        calls: &Arc<AtomicU64>,
        value: Value,
    ) -> StepFuture {
        let calls = calls.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
    }

    #[tokio::test]
    async fn test_step_result_replays_across_attempts() {
        let steps = MemoStepRunner::new();
        let calls = Arc::new(AtomicU64::new(0));

        let first = steps.run("fetch", counting_step(&calls, json!({"n": 1}))).await.unwrap();
        assert_eq!(first, json!({"n": 1}));

        steps.begin_attempt();
        let replayed = steps.run("fetch", counting_step(&calls, json!({"n": 2}))).await.unwrap();

        // the second attempt sees the first attempt's result
        assert_eq!(replayed, json!({"n": 1}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(steps.executed_count("fetch"), 1);
    }

    #[tokio::test]
    async fn test_same_name_twice_in_one_attempt_is_two_steps() {
        let steps = MemoStepRunner::new();
        let calls = Arc::new(AtomicU64::new(0));

        let a = steps.run("http-request", counting_step(&calls, json!(1))).await.unwrap();
        let b = steps.run("http-request", counting_step(&calls, json!(2))).await.unwrap();

        assert_eq!(a, json!(1));
        assert_eq!(b, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_step_is_not_memoized() {
        let steps = MemoStepRunner::new();

        let failed: Result<Value> = steps
            .run("flaky", Box::pin(async { Err(SeqflowError::Transient("boom".to_string())) }))
            .await;
        assert!(failed.is_err());

        steps.begin_attempt();
        let calls = Arc::new(AtomicU64::new(0));
        let value = steps.run("flaky", counting_step(&calls, json!("ok"))).await.unwrap();

        assert_eq!(value, json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_steps_skip_while_failed_tail_reruns() {
        let steps = MemoStepRunner::new();
        let trigger_calls = Arc::new(AtomicU64::new(0));

        // attempt 1: trigger succeeds, the request fails
        steps.run("manual-trigger", counting_step(&trigger_calls, json!({}))).await.unwrap();
        let failed: Result<Value> = steps
            .run("http-request", Box::pin(async { Err(SeqflowError::Transient("reset".to_string())) }))
            .await;
        assert!(failed.is_err());

        // attempt 2: trigger replays, the request finally runs
        steps.begin_attempt();
        steps.run("manual-trigger", counting_step(&trigger_calls, json!({}))).await.unwrap();
        let request_calls = Arc::new(AtomicU64::new(0));
        steps.run("http-request", counting_step(&request_calls, json!({"status": 200}))).await.unwrap();

        assert_eq!(trigger_calls.load(Ordering::SeqCst), 1);
        assert_eq!(request_calls.load(Ordering::SeqCst), 1);
        assert_eq!(steps.executed_count("manual-trigger"), 1);
        assert_eq!(steps.executed_count("http-request"), 1);
    }

    #[tokio::test]
    async fn test_run_ai_memoizes_like_run() {
        let steps = MemoStepRunner::new();
        let calls = Arc::new(AtomicU64::new(0));
        let meta = AiCallMeta {
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
        };

        let first = steps.run_ai("openai-generate-text", &meta, counting_step(&calls, json!({"text": "hi"}))).await.unwrap();
        steps.begin_attempt();
        let second = steps.run_ai("openai-generate-text", &meta, counting_step(&calls, json!({"text": "other"}))).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
