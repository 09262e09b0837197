//! HTTP request executor.
//!
//! Resolves the endpoint (and body, for methods that carry one)
//! against the context, issues the call through a durable step, and
//! stores `{status, statusText, data}` under the configured variable
//! name. Non-2xx responses are recorded, not raised; only transport
//! failures surface as errors.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result, SeqflowError,
    runtime::ExecutionContext,
    workflow::{
        executors::{ExecutorInput, NodeExecutor, valid_identifier},
        template,
    },
};

const HTTP_REQUEST_STEP: &str = "http-request";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestAction {
    variable_name: String,
    endpoint: String,
    method: HttpMethod,
    body: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

#[async_trait]
impl NodeExecutor for HttpRequestAction {
    fn create(params: serde_json::Value) -> Result<Self> {
        let schema = Self::schema();
        jsonschema::validate(&schema, &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["variableName", "endpoint", "method"],
            "properties": {
                "variableName": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Context key the response is stored under"
                },
                "endpoint": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Request URL, supports template expressions like {{path.to.value}}"
                },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "DELETE", "PATCH"]
                },
                "body": {
                    "type": ["string", "null"],
                    "description": "Request body for POST/PUT/PATCH, supports template expressions"
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
                "http-request node: variable name '{}' is not a valid identifier",
                self.variable_name
            )));
        }

        let mut context = input.context;
        let url = template::resolve_template(&context, &self.endpoint)?;

        let body = if self.method.carries_body() {
            match &self.body {
                Some(raw) => Some(template::resolve_template(&context, raw)?),
                None => None,
            }
        } else {
            None
        };

        let client = input.env.http.clone();
        let method: reqwest::Method = self
            .method
            .as_ref()
            .parse()
            .map_err(|_| SeqflowError::Runtime(format!("invalid method '{:?}'", self.method)))?;
        let timeout = input.env.http_timeout;

        let result = input
            .steps
            .run(
                HTTP_REQUEST_STEP,
                Box::pin(async move {
                    let mut request = client.request(method, &url).timeout(timeout);

                    if let Some(body) = body {
                        // JSON bodies get the matching content type, anything
                        // else goes out as plain text
                        let content_type = if serde_json::from_str::<Value>(&body).is_ok() {
                            "application/json"
                        } else {
                            "text/plain"
                        };
                        request = request.header(CONTENT_TYPE, content_type).body(body);
                    }

                    let response = request.send().await?;
                    let status = response.status();
                    let content_type = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let text = response.text().await?;

                    // content-type sniff decides whether the body stays text
                    let data = if content_type.contains("application/json") {
                        serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
                    } else {
                        Value::String(text)
                    };

                    Ok(json!({
                        "status": status.as_u16(),
                        "statusText": status.canonical_reason().unwrap_or_default(),
                        "data": data,
                    }))
                }),
            )
            .await?;

        context.set(self.variable_name.clone(), result);
        Ok(context)
    }
}
