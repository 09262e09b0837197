//! AI provider HTTP calls.
//!
//! One request/parse pair per provider, normalized to the same
//! surface: send a system prompt, a user prompt and a model name,
//! get the provider's raw response JSON back. Text extraction is a
//! separate pure pass so memoized responses replay through it.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{Result, SeqflowError};

use super::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

fn gemini_body(
    system_prompt: &str,
    user_prompt: &str,
) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": system_prompt }]
        },
        "contents": [{
            "parts": [{ "text": user_prompt }]
        }]
    })
}

/// Issues the provider's text-generation call and returns the parsed
/// response body.
pub(crate) async fn generate_text(
    client: &Client,
    provider: LlmProvider,
    base_url: &str,
    api_key: &str,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    timeout: Duration,
) -> Result<Value> {
    let request = match provider {
        LlmProvider::OpenAi => client.post(format!("{base_url}/chat/completions")).bearer_auth(api_key).json(&OpenAiRequest {
            model: model.to_string(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                OpenAiMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
        }),
        LlmProvider::Anthropic => client
            .post(format!("{base_url}/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&AnthropicRequest {
                model: model.to_string(),
                max_tokens: ANTHROPIC_MAX_TOKENS,
                system: system_prompt.to_string(),
                messages: vec![AnthropicMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                }],
            }),
        LlmProvider::Gemini => client.post(format!("{base_url}/models/{model}:generateContent?key={api_key}")).json(&gemini_body(system_prompt, user_prompt)),
    };

    let response = request.timeout(timeout).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(request_error(provider, status, &text));
    }

    Ok(serde_json::from_str(&text)?)
}

/// Maps a provider's failure status to the retry taxonomy: client
/// errors that a retry cannot fix are configuration errors, the rest
/// (rate limits, timeouts, server errors) are transient.
fn request_error(
    provider: LlmProvider,
    status: StatusCode,
    body: &str,
) -> SeqflowError {
    let message = format!("{} request failed with HTTP {}: {}", provider.as_ref(), status.as_u16(), body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => SeqflowError::Config(message),
        _ => SeqflowError::Transient(message),
    }
}

/// Pulls the first text content block out of a provider response. A
/// present-but-non-text first block yields an empty string; a response
/// missing the expected structure entirely is an error.
pub(crate) fn extract_text(
    provider: LlmProvider,
    response: &Value,
) -> Result<String> {
    let shape_err = || SeqflowError::Runtime(format!("unexpected {} response shape", provider.as_ref()));

    match provider {
        LlmProvider::OpenAi => {
            let message = response.pointer("/choices/0/message").ok_or_else(shape_err)?;
            Ok(message.pointer("/content").and_then(Value::as_str).unwrap_or_default().to_string())
        }
        LlmProvider::Anthropic => {
            let block = response.pointer("/content/0").ok_or_else(shape_err)?;
            if block.pointer("/type").and_then(Value::as_str) == Some("text") {
                Ok(block.pointer("/text").and_then(Value::as_str).unwrap_or_default().to_string())
            } else {
                Ok(String::new())
            }
        }
        LlmProvider::Gemini => {
            let part = response.pointer("/candidates/0/content/parts/0").ok_or_else(shape_err)?;
            Ok(part.pointer("/text").and_then(Value::as_str).unwrap_or_default().to_string())
        }
    }
}
