use regex::Regex;
use serde_json::Value;

use crate::{Result, SeqflowError, runtime::ExecutionContext};

/// Regex pattern for context placeholders.
/// Format: `{{path.to.value}}` or `{{json path.to.value}}`
const TEMPLATE_PATTERN: &str = r"\{\{\s*(json\s+)?([^{}\s]+)\s*\}\}";

/// Resolve context placeholders inside a config string.
///
/// The template language has exactly two operations:
/// - `{{path.to.value}}` substitutes the value at the dotted path as a
///   scalar (strings verbatim, numbers and booleans via display, null
///   as `null`, structured values as compact JSON);
/// - `{{json path.to.value}}` substitutes the value serialized as
///   pretty-printed JSON.
///
/// A path that resolves to nothing fails the call; silent empty
/// substitution would let typos travel into outbound requests.
pub fn resolve_template(
    context: &ExecutionContext,
    template: &str,
) -> Result<String> {
    let re = Regex::new(TEMPLATE_PATTERN).unwrap();

    let mut result = template.to_string();
    let mut errors: Vec<String> = Vec::new();

    for caps in re.captures_iter(template) {
        let full_match = &caps[0];
        let as_json = caps.get(1).is_some();
        let path = &caps[2];

        match context.get(path) {
            Some(value) => {
                let rendered = if as_json {
                    render_json(value, &mut errors)
                } else {
                    render_scalar(value)
                };
                if let Some(rendered) = rendered {
                    result = result.replace(full_match, &rendered);
                }
            }
            None => {
                errors.push(format!("variable '{}' not found in context", full_match));
            }
        }
    }

    if !errors.is_empty() {
        return Err(SeqflowError::Template(errors.join(", ")));
    }

    Ok(result)
}

fn render_scalar(value: &Value) -> Option<String> {
    Some(match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // objects and arrays fall back to compact JSON
        v => v.to_string(),
    })
}

fn render_json(
    value: &Value,
    errors: &mut Vec<String>,
) -> Option<String> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => Some(text),
        Err(e) => {
            errors.push(format!("failed to serialize value: {}", e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn context_with(value: Value) -> ExecutionContext {
        match value {
            Value::Object(map) => ExecutionContext::from_map(map),
            _ => panic!("expected object"),
        }
    }

    // ==================== scalar substitution tests ====================

    #[test]
    fn test_resolve_template_no_variables() {
        let context = ExecutionContext::new();
        let result = resolve_template(&context, "hello world").unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_resolve_template_simple_value() {
        let context = context_with(json!({"message": "hello"}));
        let result = resolve_template(&context, "{{message}}").unwrap();
        assert_eq!(result, "hello");
    }

    #[test]
    fn test_resolve_template_nested_value() {
        let context = context_with(json!({"user": {"profile": {"name": "Alice"}}}));
        let result = resolve_template(&context, "{{user.profile.name}}").unwrap();
        assert_eq!(result, "Alice");
    }

    #[test]
    fn test_resolve_template_array_index() {
        let context = context_with(json!({"items": [{"id": 7}, {"id": 8}]}));
        let result = resolve_template(&context, "{{items.1.id}}").unwrap();
        assert_eq!(result, "8");
    }

    #[test]
    fn test_resolve_template_number_value() {
        let context = context_with(json!({"count": 42}));
        let result = resolve_template(&context, "count: {{count}}").unwrap();
        assert_eq!(result, "count: 42");
    }

    #[test]
    fn test_resolve_template_bool_value() {
        let context = context_with(json!({"active": true}));
        let result = resolve_template(&context, "active: {{active}}").unwrap();
        assert_eq!(result, "active: true");
    }

    #[test]
    fn test_resolve_template_null_value() {
        let context = context_with(json!({"missing": null}));
        let result = resolve_template(&context, "got {{missing}}").unwrap();
        assert_eq!(result, "got null");
    }

    #[test]
    fn test_resolve_template_object_value_is_compact_json() {
        let context = context_with(json!({"payload": {"a": 1}}));
        let result = resolve_template(&context, "{{payload}}").unwrap();
        assert_eq!(result, r#"{"a":1}"#);
    }

    #[test]
    fn test_resolve_template_multiple_values() {
        let context = context_with(json!({"name": "Alice", "age": 30}));
        let result = resolve_template(&context, "{{name}} is {{age}} years old").unwrap();
        assert_eq!(result, "Alice is 30 years old");
    }

    #[test]
    fn test_resolve_template_repeated_placeholder() {
        let context = context_with(json!({"word": "ho"}));
        let result = resolve_template(&context, "{{word}} {{word}} {{word}}").unwrap();
        assert_eq!(result, "ho ho ho");
    }

    #[test]
    fn test_resolve_template_whitespace_inside_braces() {
        let context = context_with(json!({"name": "Bob"}));
        let result = resolve_template(&context, "hi {{ name }}").unwrap();
        assert_eq!(result, "hi Bob");
    }

    // ==================== json substitution tests ====================

    #[test]
    fn test_resolve_template_json_operation() {
        let context = context_with(json!({"payload": {"a": 1}}));
        let result = resolve_template(&context, "{{json payload}}").unwrap();
        assert_eq!(result, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_resolve_template_json_scalar() {
        let context = context_with(json!({"name": "Alice"}));
        let result = resolve_template(&context, "{{json name}}").unwrap();
        assert_eq!(result, "\"Alice\"");
    }

    #[test]
    fn test_resolve_template_json_nested_path() {
        let context = context_with(json!({"res": {"data": [1, 2]}}));
        let result = resolve_template(&context, "{{json res.data}}").unwrap();
        assert_eq!(result, "[\n  1,\n  2\n]");
    }

    #[test]
    fn test_resolve_template_mixed_operations() {
        let context = context_with(json!({"name": "Alice", "extra": {"b": 2}}));
        let result = resolve_template(&context, "{{name}}: {{json extra}}").unwrap();
        assert_eq!(result, "Alice: {\n  \"b\": 2\n}");
    }

    // ==================== failure policy tests ====================

    #[test]
    fn test_resolve_template_missing_path_fails() {
        let context = ExecutionContext::new();
        let result = resolve_template(&context, "{{unknown.value}}");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_resolve_template_missing_nested_key_fails() {
        let context = context_with(json!({"user": {"name": "Alice"}}));
        let result = resolve_template(&context, "{{user.email}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_template_collects_all_missing_paths() {
        let context = ExecutionContext::new();
        let err = resolve_template(&context, "{{a}} and {{b}}").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("{{a}}"));
        assert!(message.contains("{{b}}"));
    }

    #[test]
    fn test_resolve_template_error_is_template_variant() {
        let context = ExecutionContext::new();
        match resolve_template(&context, "{{nope}}") {
            Err(SeqflowError::Template(_)) => {}
            other => panic!("expected template error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_template_malformed_braces_left_alone() {
        let context = context_with(json!({"a": 1}));
        let result = resolve_template(&context, "{{a}} {not a placeholder} {{").unwrap();
        assert_eq!(result, "1 {not a placeholder} {{");
    }
}
