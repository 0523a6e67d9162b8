//! Typed access to validated tool arguments.

use serde_json::{Map, Value};

/// Caller-side argument problem (missing field, wrong shape).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ArgumentError(pub String);

impl ArgumentError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<crate::remote::TemplateError> for ArgumentError {
    fn from(err: crate::remote::TemplateError) -> Self {
        Self(err.to_string())
    }
}

/// Argument bag for one invocation, defaults already filled.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw map, used for endpoint template interpolation.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Present, non-null value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn str(&self, key: &str) -> Result<&str, ArgumentError> {
        self.opt_str(key)
            .ok_or_else(|| ArgumentError::new(format!("Missing required field: {}", key)))
    }

    /// Non-blank string value, trimmed.
    pub fn opt_str(&self, key: &str) -> Option<&str> {
        self.value(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn opt_string(&self, key: &str) -> Option<String> {
        self.opt_str(key).map(str::to_string)
    }

    pub fn opt_u64(&self, key: &str) -> Option<u64> {
        self.value(key).and_then(Value::as_u64)
    }

    pub fn opt_bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    /// Required non-negative integer.
    pub fn u64(&self, key: &str) -> Result<u64, ArgumentError> {
        let value = self
            .value(key)
            .ok_or_else(|| ArgumentError::new(format!("Missing required field: {}", key)))?;
        value
            .as_u64()
            .ok_or_else(|| ArgumentError::new(format!("{} must be a non-negative integer", key)))
    }

    /// Non-empty list of non-blank strings, trimmed. Blank entries are
    /// rejected rather than dropped so result indices match the input.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, ArgumentError> {
        let items = self
            .value(key)
            .and_then(Value::as_array)
            .ok_or_else(|| ArgumentError::new(format!("Missing required field: {}", key)))?;
        if items.is_empty() {
            return Err(ArgumentError::new(format!("{} must contain at least one value", key)));
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| ArgumentError::new(format!("{}[{}] must be non-empty", key, i)))
            })
            .collect()
    }

    pub fn object_list(&self, key: &str) -> Result<Vec<Map<String, Value>>, ArgumentError> {
        let items = self
            .value(key)
            .and_then(Value::as_array)
            .ok_or_else(|| ArgumentError::new(format!("Missing required field: {}", key)))?;
        if items.is_empty() {
            return Err(ArgumentError::new(format!("{} must contain at least one item", key)));
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| ArgumentError::new(format!("{}[{}] must be an object", key, i)))
            })
            .collect()
    }

    /// Comma-separated list from either a string or an array of strings.
    pub fn opt_csv(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Array(items) => {
                let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!joined.is_empty()).then(|| joined.join(","))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        ToolArgs::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_str_trims_and_rejects_blank() {
        let a = args(json!({"key": "  A-1 ", "blank": "   ", "null": null}));
        assert_eq!(a.str("key").unwrap(), "A-1");
        assert!(a.str("blank").is_err());
        assert!(a.str("null").is_err());
        assert_eq!(
            a.str("missing").unwrap_err(),
            ArgumentError::new("Missing required field: missing")
        );
    }

    #[test]
    fn test_numbers_and_bools() {
        let a = args(json!({"n": 5, "b": true, "neg": -1}));
        assert_eq!(a.opt_u64("n"), Some(5));
        assert_eq!(a.opt_u64("neg"), None);
        assert_eq!(a.opt_bool("b"), Some(true));
    }

    #[test]
    fn test_required_u64() {
        let a = args(json!({"n": 7, "neg": -3, "text": "7"}));
        assert_eq!(a.u64("n").unwrap(), 7);
        assert_eq!(
            a.u64("neg").unwrap_err(),
            ArgumentError::new("neg must be a non-negative integer")
        );
        assert!(a.u64("text").is_err());
        assert_eq!(
            a.u64("missing").unwrap_err(),
            ArgumentError::new("Missing required field: missing")
        );
    }

    #[test]
    fn test_string_list() {
        let a = args(json!({"keys": [" A-1", "A-2 "], "empty": []}));
        assert_eq!(a.string_list("keys").unwrap(), vec!["A-1", "A-2"]);
        assert!(a.string_list("empty").is_err());
    }

    #[test]
    fn test_string_list_rejects_blank_entries_by_index() {
        let a = args(json!({"keys": ["A-1", " ", "A-2"], "mixed": ["A-1", 5]}));
        assert_eq!(
            a.string_list("keys").unwrap_err(),
            ArgumentError::new("keys[1] must be non-empty")
        );
        assert_eq!(
            a.string_list("mixed").unwrap_err(),
            ArgumentError::new("mixed[1] must be non-empty")
        );
    }

    #[test]
    fn test_object_list() {
        let a = args(json!({"items": [{"a": 1}, {"b": 2}], "bad": [{"a": 1}, 3]}));
        assert_eq!(a.object_list("items").unwrap().len(), 2);
        assert_eq!(
            a.object_list("bad").unwrap_err(),
            ArgumentError::new("bad[1] must be an object")
        );
    }

    #[test]
    fn test_opt_csv() {
        let a = args(json!({"s": "summary,status", "l": ["summary", "status"], "e": []}));
        assert_eq!(a.opt_csv("s").as_deref(), Some("summary,status"));
        assert_eq!(a.opt_csv("l").as_deref(), Some("summary,status"));
        assert_eq!(a.opt_csv("e"), None);
    }
}
