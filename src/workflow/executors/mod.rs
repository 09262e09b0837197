//! Node executors.
//!
//! Each node type the engine can run has an executor holding that
//! type's validated configuration. Parsing happens once, when a node
//! is about to execute: the raw `data` blob is checked against the
//! executor's schema and deserialized into its config struct, so a
//! malformed node fails with a configuration error before any work
//! starts. Executors themselves are pure with respect to status
//! events: they take a context, do their work through the durable
//! step runner, and return the next context. The runner owns event
//! delivery.

pub mod edit_fields;
pub mod http_request;
pub mod llm;
pub mod trigger;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use regex::Regex;

use crate::{
    Result, SeqflowError,
    model::NodeType,
    runtime::{ExecutionContext, StepRunner},
    secrets::CredentialCipher,
    store::Store,
};

pub use edit_fields::EditFieldsAction;
pub use http_request::HttpRequestAction;
pub use llm::{LlmAction, LlmProvider};
pub use trigger::{GoogleFormTriggerAction, ManualTriggerAction};

/// Keys written into the context must be usable as template path
/// segments, so they follow identifier rules.
const IDENTIFIER_PATTERN: &str = r"^[a-zA-Z_$][A-Za-z0-9_$]*$";

pub(crate) fn valid_identifier(name: &str) -> bool {
    let re = Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid");
    re.is_match(name)
}

/// Shared services an executor may reach during a run.
#[derive(Clone)]
pub struct ExecEnv {
    /// Client for outbound requests, also used for provider calls.
    pub http: reqwest::Client,
    pub store: Arc<Store>,
    pub cipher: Arc<dyn CredentialCipher>,
    pub providers: ProviderEndpoints,
    /// Per-request timeout for outbound calls.
    pub http_timeout: Duration,
}

impl ExecEnv {
    pub fn new(
        store: Arc<Store>,
        cipher: Arc<dyn CredentialCipher>,
        http_timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            cipher,
            providers: ProviderEndpoints::default(),
            http_timeout,
        }
    }
}

/// Base URLs of the AI provider APIs. Overridable so tests can point
/// a node at a local endpoint.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub anthropic: String,
    pub gemini: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com/v1".to_string(),
            anthropic: "https://api.anthropic.com/v1".to_string(),
            gemini: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl ProviderEndpoints {
    pub fn base(
        &self,
        provider: LlmProvider,
    ) -> &str {
        match provider {
            LlmProvider::OpenAi => &self.openai,
            LlmProvider::Anthropic => &self.anthropic,
            LlmProvider::Gemini => &self.gemini,
        }
    }
}

/// Per-invocation inputs handed to an executor by the runner.
pub struct ExecutorInput<'a> {
    pub node_id: &'a str,
    /// Owner of the workflow, scopes credential lookups.
    pub user_id: &'a str,
    pub context: ExecutionContext,
    pub steps: &'a dyn StepRunner,
    pub env: &'a ExecEnv,
}

/// The uniform contract every node type implements.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Creates the executor from a node's raw `data` blob, validating
    /// it against [`NodeExecutor::schema`] first.
    fn create(params: serde_json::Value) -> Result<Self>
    where
        Self: Sized;

    /// Returns the JSON schema the node's `data` must satisfy.
    fn schema() -> serde_json::Value
    where
        Self: Sized;

    /// Consumes the accumulated context and returns the context for
    /// the next node. Errors propagate unchanged; the runner decides
    /// retriability from the error kind.
    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<ExecutionContext>;
}

/// Closed set of runnable node behaviors, keyed by [`NodeType`].
///
/// Adding a node type means adding a variant here, which the compiler
/// then forces through every dispatch site.
#[derive(Debug, Clone)]
pub enum NodeAction {
    ManualTrigger(ManualTriggerAction),
    GoogleFormTrigger(GoogleFormTriggerAction),
    HttpRequest(HttpRequestAction),
    EditFields(EditFieldsAction),
    OpenAi(LlmAction),
    Anthropic(LlmAction),
    Gemini(LlmAction),
}

impl NodeAction {
    /// Resolves a node's type tag to its executor and validates the
    /// node's config. The editor-only placeholder type has no
    /// executor, hitting it at run time is a configuration defect.
    pub fn parse(
        kind: NodeType,
        data: serde_json::Value,
    ) -> Result<Self> {
        match kind {
            NodeType::Initial => Err(SeqflowError::Config(format!(
                "no executor registered for node type '{}'",
                kind
            ))),
            NodeType::ManualTrigger => Ok(Self::ManualTrigger(ManualTriggerAction::create(data)?)),
            NodeType::GoogleFormTrigger => Ok(Self::GoogleFormTrigger(GoogleFormTriggerAction::create(data)?)),
            NodeType::HttpRequest => Ok(Self::HttpRequest(HttpRequestAction::create(data)?)),
            NodeType::EditFields => Ok(Self::EditFields(EditFieldsAction::create(data)?)),
            NodeType::Openai => Ok(Self::OpenAi(LlmAction::create(data)?.for_provider(LlmProvider::OpenAi))),
            NodeType::Anthropic => Ok(Self::Anthropic(LlmAction::create(data)?.for_provider(LlmProvider::Anthropic))),
            NodeType::Gemini => Ok(Self::Gemini(LlmAction::create(data)?.for_provider(LlmProvider::Gemini))),
        }
    }

    pub async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<ExecutionContext> {
        match self {
            Self::ManualTrigger(action) => action.execute(input).await,
            Self::GoogleFormTrigger(action) => action.execute(input).await,
            Self::HttpRequest(action) => action.execute(input).await,
            Self::EditFields(action) => action.execute(input).await,
            Self::OpenAi(action) => action.execute(input).await,
            Self::Anthropic(action) => action.execute(input).await,
            Self::Gemini(action) => action.execute(input).await,
        }
    }
}
