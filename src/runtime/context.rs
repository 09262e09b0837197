//! The data bag a run accumulates while nodes execute.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// String-keyed JSON map threaded through the node sequence.
///
/// Every executor receives the current context and returns the next
/// one. Writes are last-write-wins and keys are never removed; all
/// merge semantics live here so executors cannot invent their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self { values: Map::new() }
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Dotted-path lookup into nested values, e.g.
    /// `get("response.data.items.0")`. Numeric segments index arrays.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Insert or overwrite a top-level key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Bulk insert; existing keys are overwritten, nothing is removed.
    pub fn merge(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.values.insert(key, value);
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Compact JSON of the whole context, the form stored as a run's
    /// terminal `output`.
    pub fn to_json(&self) -> String {
        Value::Object(self.values.clone()).to_string()
    }
}

impl From<Map<String, Value>> for ExecutionContext {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_set_is_last_write_wins() {
        let mut context = ExecutionContext::new();
        context.set("greeting", "hello");
        context.set("greeting", "goodbye");
        assert_eq!(context.get("greeting"), Some(&json!("goodbye")));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_merge_overwrites_and_keeps_the_rest() {
        let mut context = ExecutionContext::from_map(map(json!({"a": 1, "b": 2})));
        context.merge(map(json!({"b": 20, "c": 3})));
        assert_eq!(context.get("a"), Some(&json!(1)));
        assert_eq!(context.get("b"), Some(&json!(20)));
        assert_eq!(context.get("c"), Some(&json!(3)));
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn test_dotted_path_lookup() {
        let context = ExecutionContext::from_map(map(json!({
            "response": {"data": {"items": [{"id": 7}]}, "status": 200}
        })));
        assert_eq!(context.get("response.status"), Some(&json!(200)));
        assert_eq!(context.get("response.data.items.0.id"), Some(&json!(7)));
        assert_eq!(context.get("response.data.missing"), None);
        assert_eq!(context.get("response.data.items.9"), None);
    }

    #[test]
    fn test_path_through_scalar_is_none() {
        let context = ExecutionContext::from_map(map(json!({"n": 5})));
        assert_eq!(context.get("n.deeper"), None);
    }

    #[test]
    fn test_serde_is_transparent() {
        let context = ExecutionContext::from_map(map(json!({"x": true})));
        let text = serde_json::to_string(&context).expect("serialize");
        assert_eq!(text, r#"{"x":true}"#);
        let back: ExecutionContext = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, context);
    }
}
