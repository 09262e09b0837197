//! AI provider node executors.
//!
//! The three provider nodes share one config shape and one flow:
//! resolve prompts against the context, look up and decrypt the
//! owner's credential, call the provider through a durable AI step,
//! and store `{text}` under the variable name. Only the wire call
//! differs per provider.

mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    Result, SeqflowError,
    runtime::{AiCallMeta, ExecutionContext},
    workflow::{
        executors::{ExecutorInput, NodeExecutor, valid_identifier},
        template,
    },
};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Anthropic,
    Gemini,
}

impl LlmProvider {
    /// Durable step name for this provider's generation call.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai-generate-text",
            Self::Anthropic => "anthropic-generate-text",
            Self::Gemini => "gemini-generate-text",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LlmAction {
    variable_name: String,
    model: String,
    #[serde(default)]
    system_prompt: Option<String>,
    user_prompt: String,
    credential_id: String,
    #[serde(skip)]
    provider: LlmProvider,
}

impl LlmAction {
    /// Binds the parsed config to the provider named by the node's
    /// type tag.
    pub fn for_provider(
        mut self,
        provider: LlmProvider,
    ) -> Self {
        self.provider = provider;
        self
    }

    fn api_key(
        &self,
        input: &ExecutorInput<'_>,
    ) -> Result<String> {
        let not_found = || {
            SeqflowError::Config(format!(
                "{} node: credential '{}' not found",
                self.provider.as_ref(),
                self.credential_id
            ))
        };

        let credential = input.env.store.credentials().find(&self.credential_id).map_err(|_| not_found())?;
        // lookups are scoped to the workflow owner
        if credential.user_id != input.user_id {
            return Err(not_found());
        }
        if credential.kind != self.provider.as_ref() {
            return Err(SeqflowError::Config(format!(
                "{} node: credential '{}' belongs to provider '{}'",
                self.provider.as_ref(),
                self.credential_id,
                credential.kind
            )));
        }

        input.env.cipher.decrypt(&credential.value)
    }
}

#[async_trait]
impl NodeExecutor for LlmAction {
    fn create(params: serde_json::Value) -> Result<Self> {
        let schema = Self::schema();
        jsonschema::validate(&schema, &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["variableName", "model", "userPrompt", "credentialId"],
            "properties": {
                "variableName": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Context key the generated text is stored under"
                },
                "model": {
                    "type": "string",
                    "minLength": 1
                },
                "systemPrompt": {
                    "type": ["string", "null"],
                    "description": "Optional, supports template expressions"
                },
                "userPrompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Supports template expressions like {{path.to.value}}"
                },
                "credentialId": {
                    "type": "string",
                    "minLength": 1
                }
            }
        })
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<ExecutionContext> {
        if !valid_identifier(&self.variable_name) {
            return Err(SeqflowError::Config(format!(
                "{} node: variable name '{}' is not a valid identifier",
                self.provider.as_ref(),
                self.variable_name
            )));
        }

        let api_key = self.api_key(&input)?;
        let mut context = input.context;

        let system_prompt = match self.system_prompt.as_deref() {
            Some(text) if !text.is_empty() => template::resolve_template(&context, text)?,
            _ => DEFAULT_SYSTEM_PROMPT.to_string(),
        };
        let user_prompt = template::resolve_template(&context, &self.user_prompt)?;

        let meta = AiCallMeta {
            provider: self.provider.as_ref().to_string(),
            model: self.model.clone(),
        };

        let client = input.env.http.clone();
        let provider = self.provider;
        let base_url = input.env.providers.base(provider).to_string();
        let model = self.model.clone();
        let timeout = input.env.http_timeout;

        let response = input
            .steps
            .run_ai(
                provider.step_name(),
                &meta,
                Box::pin(async move { providers::generate_text(&client, provider, &base_url, &api_key, &model, &system_prompt, &user_prompt, timeout).await }),
            )
            .await?;

        let text = providers::extract_text(provider, &response)?;

        context.set(self.variable_name.clone(), json!({ "text": text }));
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        sync::Arc,
        thread,
        time::Duration,
    };

    use serde_json::json;

    use super::*;
    use crate::{
        runtime::MemoStepRunner,
        secrets::{Base64Cipher, CredentialCipher},
        store::{DbStore, MemStore, Store, data::Credential},
        utils,
        workflow::executors::ExecEnv,
    };

    fn test_env() -> ExecEnv {
        let store = Store::new();
        MemStore::new().init(&store);
        ExecEnv::new(Arc::new(store), Arc::new(Base64Cipher), Duration::from_millis(2000))
    }

    fn seed_credential(
        env: &ExecEnv,
        id: &str,
        user_id: &str,
        kind: &str,
        secret: &str,
    ) {
        let credential = Credential {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("{kind} key"),
            kind: kind.to_string(),
            value: Base64Cipher.encrypt(secret).unwrap(),
            create_time: utils::time::time_millis(),
            update_time: 0,
        };
        env.store.credentials().create(&credential).unwrap();
    }

    fn spawn_server(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut socket, _)) = listener.accept() {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf);
                let _ = socket.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    fn json_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    fn openai_action() -> LlmAction {
        LlmAction::create(json!({
            "variableName": "answer",
            "model": "gpt-4.1-mini",
            "userPrompt": "Say hi",
            "credentialId": "cred1"
        }))
        .unwrap()
        .for_provider(LlmProvider::OpenAi)
    }

    #[test]
    fn test_create_requires_credential_id() {
        let err = LlmAction::create(json!({
            "variableName": "answer",
            "model": "gpt-4.1-mini",
            "userPrompt": "Say hi"
        }))
        .unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let action = openai_action();
        let steps = MemoStepRunner::new();
        let env = test_env();

        let err = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SeqflowError::Config(_)));
        assert!(!err.is_retriable());
        assert_eq!(steps.executed_count("openai-generate-text"), 0);
    }

    #[tokio::test]
    async fn test_credential_of_other_user_is_not_found() {
        let action = openai_action();
        let steps = MemoStepRunner::new();
        let env = test_env();
        seed_credential(&env, "cred1", "someone-else", "openai", "sk-test");

        let err = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_credential_provider_mismatch_is_fatal() {
        let action = openai_action();
        let steps = MemoStepRunner::new();
        let env = test_env();
        seed_credential(&env, "cred1", "u1", "anthropic", "sk-test");

        let err = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SeqflowError::Config(_)));
        assert!(err.to_string().contains("belongs to provider"));
    }

    #[tokio::test]
    async fn test_openai_call_stores_text_under_variable() {
        let base = spawn_server(json_response(r#"{"choices":[{"message":{"content":"Hello from the model"}}]}"#));
        let action = LlmAction::create(json!({
            "variableName": "answer",
            "model": "gpt-4.1-mini",
            "systemPrompt": "Answer as {{persona}}",
            "userPrompt": "Say hi",
            "credentialId": "cred1"
        }))
        .unwrap()
        .for_provider(LlmProvider::OpenAi);

        let steps = MemoStepRunner::new();
        let mut env = test_env();
        env.providers.openai = base;
        seed_credential(&env, "cred1", "u1", "openai", "sk-test");

        let mut context = ExecutionContext::new();
        context.set("persona", json!("a pirate"));

        let context = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context,
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap();

        assert_eq!(context.get("answer.text"), Some(&json!("Hello from the model")));
        assert_eq!(steps.executed_count("openai-generate-text"), 1);
        // upstream keys survive
        assert_eq!(context.get("persona"), Some(&json!("a pirate")));
    }

    #[tokio::test]
    async fn test_anthropic_call_extracts_first_text_block() {
        let base = spawn_server(json_response(r#"{"content":[{"type":"text","text":"Claude speaking"}]}"#));
        let action = LlmAction::create(json!({
            "variableName": "answer",
            "model": "claude-sonnet-4-5",
            "userPrompt": "Say hi",
            "credentialId": "cred2"
        }))
        .unwrap()
        .for_provider(LlmProvider::Anthropic);

        let steps = MemoStepRunner::new();
        let mut env = test_env();
        env.providers.anthropic = base;
        seed_credential(&env, "cred2", "u1", "anthropic", "sk-ant");

        let context = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap();

        assert_eq!(context.get("answer.text"), Some(&json!("Claude speaking")));
        assert_eq!(steps.executed_count("anthropic-generate-text"), 1);
    }

    #[tokio::test]
    async fn test_gemini_call_extracts_part_text() {
        let base = spawn_server(json_response(r#"{"candidates":[{"content":{"parts":[{"text":"Gemini here"}]}}]}"#));
        let action = LlmAction::create(json!({
            "variableName": "answer",
            "model": "gemini-2.5-flash",
            "userPrompt": "Say hi",
            "credentialId": "cred3"
        }))
        .unwrap()
        .for_provider(LlmProvider::Gemini);

        let steps = MemoStepRunner::new();
        let mut env = test_env();
        env.providers.gemini = base;
        seed_credential(&env, "cred3", "u1", "gemini", "g-key");

        let context = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap();

        assert_eq!(context.get("answer.text"), Some(&json!("Gemini here")));
    }

    #[tokio::test]
    async fn test_unauthorized_response_is_fatal() {
        let base = spawn_server(
            "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}".to_string(),
        );
        let action = openai_action();
        let steps = MemoStepRunner::new();
        let mut env = test_env();
        env.providers.openai = base;
        seed_credential(&env, "cred1", "u1", "openai", "sk-test");

        let err = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SeqflowError::Config(_)));
        assert!(!err.is_retriable());
    }
}
