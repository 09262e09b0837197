//! Field editor executor.
//!
//! Writes a list of `{name, type, value}` definitions straight into
//! the context, coercing each value to its declared type. Runs inline
//! with no durable step; the transform is pure and cheap to redo on a
//! retried run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result, SeqflowError,
    runtime::ExecutionContext,
    workflow::executors::{ExecutorInput, NodeExecutor, valid_identifier},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditFieldsAction {
    fields: Vec<FieldDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    kind: FieldKind,
    value: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// Coerces a raw field value to its declared kind. Structured kinds
/// accept either a JSON string to parse or an already-structured
/// value; scalar kinds convert from the usual JSON forms.
fn coerce(
    kind: FieldKind,
    value: &Value,
) -> std::result::Result<Value, String> {
    match kind {
        FieldKind::Object | FieldKind::Array => match value {
            Value::String(text) => serde_json::from_str(text).map_err(|err| format!("invalid JSON: {err}")),
            other => Ok(other.clone()),
        },
        FieldKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(text) => {
                let trimmed = text.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    Ok(Value::from(n))
                } else if let Ok(f) = trimmed.parse::<f64>() {
                    serde_json::Number::from_f64(f).map(Value::Number).ok_or_else(|| "not a valid number".to_string())
                } else {
                    Err("not a valid number".to_string())
                }
            }
            Value::Bool(flag) => Ok(Value::from(*flag as i64)),
            _ => Err("not a valid number".to_string()),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(text) => Ok(Value::Bool(text.to_lowercase() == "true")),
            Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
            Value::Null => Ok(Value::Bool(false)),
            _ => Ok(Value::Bool(true)),
        },
        FieldKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Null => Ok(Value::from("null")),
            Value::Number(_) | Value::Bool(_) => Ok(Value::from(value.to_string())),
            structured => serde_json::to_string(structured).map(Value::from).map_err(|err| err.to_string()),
        },
    }
}

#[async_trait]
impl NodeExecutor for EditFieldsAction {
    fn create(params: serde_json::Value) -> Result<Self> {
        let schema = Self::schema();
        jsonschema::validate(&schema, &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["fields"],
            "properties": {
                "fields": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "type", "value"],
                        "properties": {
                            "name": {
                                "type": "string",
                                "minLength": 1,
                                "description": "Context key to write, must be a valid identifier"
                            },
                            "type": {
                                "type": "string",
                                "enum": ["string", "number", "boolean", "object", "array"]
                            },
                            "value": {
                                "description": "Raw value, coerced to the declared type"
                            }
                        }
                    }
                }
            }
        })
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<ExecutionContext> {
        let mut context = input.context;

        for field in &self.fields {
            if !valid_identifier(&field.name) {
                return Err(SeqflowError::Config(format!(
                    "edit-fields node: field name '{}' is not a valid identifier",
                    field.name
                )));
            }

            let value = coerce(field.kind, &field.value).map_err(|reason| {
                SeqflowError::Config(format!(
                    "edit-fields node: failed to convert field '{}' to {}: {}",
                    field.name,
                    field.kind.as_ref(),
                    reason
                ))
            })?;

            // duplicate names: last definition wins
            context.set(field.name.clone(), value);
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;

    use super::*;
    use crate::{
        runtime::MemoStepRunner,
        secrets::Base64Cipher,
        store::{DbStore, MemStore, Store},
        workflow::executors::ExecEnv,
    };

    fn test_env() -> ExecEnv {
        let store = Store::new();
        MemStore::new().init(&store);
        ExecEnv::new(Arc::new(store), Arc::new(Base64Cipher), Duration::from_millis(2000))
    }

    async fn run_fields(fields: serde_json::Value) -> Result<ExecutionContext> {
        let action = EditFieldsAction::create(json!({ "fields": fields }))?;
        let steps = MemoStepRunner::new();
        let env = test_env();
        action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context: ExecutionContext::new(),
                steps: &steps,
                env: &env,
            })
            .await
    }

    #[tokio::test]
    async fn test_number_coercion_from_string() {
        let context = run_fields(json!([{"name": "n", "type": "number", "value": "42"}])).await.unwrap();
        assert_eq!(context.get("n"), Some(&json!(42)));

        let context = run_fields(json!([{"name": "pi", "type": "number", "value": "3.14"}])).await.unwrap();
        assert_eq!(context.get("pi"), Some(&json!(3.14)));
    }

    #[tokio::test]
    async fn test_invalid_number_fails_fatally() {
        let err = run_fields(json!([{"name": "n", "type": "number", "value": "abc"}])).await.unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_boolean_coercion() {
        let context = run_fields(json!([
            {"name": "yes", "type": "boolean", "value": "true"},
            {"name": "no", "type": "boolean", "value": "False"},
            {"name": "already", "type": "boolean", "value": true},
            {"name": "zero", "type": "boolean", "value": 0}
        ]))
        .await
        .unwrap();

        assert_eq!(context.get("yes"), Some(&json!(true)));
        assert_eq!(context.get("no"), Some(&json!(false)));
        assert_eq!(context.get("already"), Some(&json!(true)));
        assert_eq!(context.get("zero"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_object_parses_json_string() {
        let context = run_fields(json!([
            {"name": "cfg", "type": "object", "value": "{\"depth\": 3}"},
            {"name": "tags", "type": "array", "value": "[1, 2]"},
            {"name": "passthrough", "type": "object", "value": {"kept": true}}
        ]))
        .await
        .unwrap();

        assert_eq!(context.get("cfg.depth"), Some(&json!(3)));
        assert_eq!(context.get("tags"), Some(&json!([1, 2])));
        assert_eq!(context.get("passthrough.kept"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_malformed_json_object_fails_fatally() {
        let err = run_fields(json!([{"name": "cfg", "type": "object", "value": "{broken"}])).await.unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_string_coercion_stringifies() {
        let context = run_fields(json!([
            {"name": "n", "type": "string", "value": 42},
            {"name": "flag", "type": "string", "value": true},
            {"name": "obj", "type": "string", "value": {"a": 1}}
        ]))
        .await
        .unwrap();

        assert_eq!(context.get("n"), Some(&json!("42")));
        assert_eq!(context.get("flag"), Some(&json!("true")));
        assert_eq!(context.get("obj"), Some(&json!("{\"a\":1}")));
    }

    #[tokio::test]
    async fn test_invalid_field_name_fails() {
        let err = run_fields(json!([{"name": "not valid", "type": "string", "value": "x"}])).await.unwrap_err();
        assert!(matches!(err, SeqflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_duplicate_names_last_wins() {
        let context = run_fields(json!([
            {"name": "n", "type": "number", "value": "1"},
            {"name": "n", "type": "number", "value": "2"}
        ]))
        .await
        .unwrap();

        assert_eq!(context.get("n"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_fields_merge_into_existing_context() {
        let action = EditFieldsAction::create(json!({
            "fields": [{"name": "added", "type": "string", "value": "new"}]
        }))
        .unwrap();
        let steps = MemoStepRunner::new();
        let env = test_env();

        let mut context = ExecutionContext::new();
        context.set("kept", json!("old"));

        let result = action
            .execute(ExecutorInput {
                node_id: "n1",
                user_id: "u1",
                context,
                steps: &steps,
                env: &env,
            })
            .await
            .unwrap();

        assert_eq!(result.get("kept"), Some(&json!("old")));
        assert_eq!(result.get("added"), Some(&json!("new")));
    }
}
