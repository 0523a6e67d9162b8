//! Remote request description.
//!
//! A `RemoteRequest` is built fresh for every call from an endpoint template
//! such as `/rest/api/2/issue/{issue_key}/comment`. Placeholders are filled from
//! tool arguments and kept as separate path segments so the adapter can
//! percent-encode each one independently.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// HTTP verb used against the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while interpolating an endpoint template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("missing value for path parameter '{0}'")]
    MissingParam(String),

    #[error("path parameter '{0}' must be a non-empty string or integer")]
    InvalidParam(String),
}

/// One immutable HTTP-style request against the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl RemoteRequest {
    /// Build a request for a literal path (no placeholders).
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: split_path(path).map(str::to_string).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Build a request from an endpoint template, filling `{name}`
    /// placeholders from `params`.
    pub fn from_template(
        method: Method,
        template: &str,
        params: &Map<String, Value>,
    ) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        for segment in split_path(template) {
            match segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingParam(name.to_string()))?;
                    segments.push(path_value(name, value)?);
                }
                None => segments.push(segment.to_string()),
            }
        }
        Ok(Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
        })
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a query parameter only when a value is present.
    pub fn with_optional_query(self, key: &str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.with_query(key, v),
            None => self,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Unencoded path segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Display form of the path, e.g. `/rest/api/2/issue/ABC-1`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for RemoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn path_value(name: &str, value: &Value) -> Result<String, TemplateError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        _ => Err(TemplateError::InvalidParam(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_literal_path() {
        let req = RemoteRequest::new(Method::Get, "/rest/api/2/myself");
        assert_eq!(req.segments(), ["rest", "api", "2", "myself"]);
        assert_eq!(req.path(), "/rest/api/2/myself");
        assert_eq!(req.to_string(), "GET /rest/api/2/myself");
    }

    #[test]
    fn test_template_interpolation() {
        let req = RemoteRequest::from_template(
            Method::Post,
            "/rest/api/2/issue/{issue_key}/comment",
            &params(json!({"issue_key": "PROJ-12"})),
        )
        .unwrap();
        assert_eq!(req.path(), "/rest/api/2/issue/PROJ-12/comment");
    }

    #[test]
    fn test_template_accepts_integer_ids() {
        let req = RemoteRequest::from_template(
            Method::Get,
            "/rest/agile/1.0/board/{board_id}/sprint",
            &params(json!({"board_id": 42})),
        )
        .unwrap();
        assert_eq!(req.segments()[4], "42");
    }

    #[test]
    fn test_template_keeps_reserved_characters_in_one_segment() {
        let req = RemoteRequest::from_template(
            Method::Get,
            "/rest/api/2/issue/{issue_key}",
            &params(json!({"issue_key": "../admin"})),
        )
        .unwrap();
        // Encoding happens in the adapter; the value stays a single segment.
        assert_eq!(req.segments().len(), 5);
        assert_eq!(req.segments()[4], "../admin");
    }

    #[test]
    fn test_template_missing_param() {
        let err = RemoteRequest::from_template(
            Method::Get,
            "/rest/api/2/issue/{issue_key}",
            &Map::new(),
        )
        .unwrap_err();
        assert_eq!(err, TemplateError::MissingParam("issue_key".to_string()));
    }

    #[test]
    fn test_template_rejects_blank_and_non_scalar_values() {
        for bad in [json!(""), json!("   "), json!(true), json!({"a": 1}), json!(1.5)] {
            let err = RemoteRequest::from_template(
                Method::Get,
                "/rest/api/2/issue/{issue_key}",
                &params(json!({ "issue_key": bad })),
            )
            .unwrap_err();
            assert!(matches!(err, TemplateError::InvalidParam(_)));
        }
    }

    #[test]
    fn test_query_and_body_builders() {
        let req = RemoteRequest::new(Method::Get, "/rest/api/2/search")
            .with_query("jql", "project = ABC")
            .with_optional_query("fields", None)
            .with_optional_query("expand", Some("changelog".to_string()))
            .with_body(json!({"x": 1}));
        assert_eq!(
            req.query(),
            [
                ("jql".to_string(), "project = ABC".to_string()),
                ("expand".to_string(), "changelog".to_string())
            ]
        );
        assert_eq!(req.body(), Some(&json!({"x": 1})));
    }
}
