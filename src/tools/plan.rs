//! Execution plans produced by tool request builders.
//!
//! A plan is pure data: which remote calls to make and how to shape the
//! result. The router executes it.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::args::ArgumentError;
use crate::batch::BatchItem;
use crate::remote::{Method, RemoteRequest};

/// How an invocation reaches the remote service.
#[derive(Debug, Clone)]
pub enum Plan {
    /// One call; the payload goes through `shape`.
    Single { request: RemoteRequest, shape: Shape },
    /// Independent calls fanned out through the batch engine.
    Batch(Vec<BatchItem>),
    /// Read the available transitions, then perform the matching one.
    Transition(TransitionPlan),
}

impl Plan {
    /// Single call with the payload passed through untouched.
    pub fn single(request: RemoteRequest) -> Self {
        Plan::Single {
            request,
            shape: Shape::Raw,
        }
    }
}

/// Result shaping for single-call tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Raw,
    /// Keep field definitions whose id or name contains the keyword
    /// (case-insensitive), at most `limit` of them.
    FieldFilter { keyword: String, limit: usize },
}

impl Shape {
    pub fn apply(&self, payload: Value) -> Value {
        match self {
            Shape::Raw => payload,
            Shape::FieldFilter { keyword, limit } => {
                let fields = match payload {
                    Value::Array(fields) => fields,
                    other => return other,
                };
                let needle = keyword.to_lowercase();
                let matches = |field: &Value| {
                    ["id", "name"].iter().any(|k| {
                        field
                            .get(*k)
                            .and_then(Value::as_str)
                            .map_or(false, |s| s.to_lowercase().contains(&needle))
                    })
                };
                Value::Array(
                    fields
                        .into_iter()
                        .filter(|f| needle.is_empty() || matches(f))
                        .take(*limit)
                        .collect(),
                )
            }
        }
    }
}

// =============================================================================
// Transition lookup-then-act
// =============================================================================

/// A transition the issue can currently take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableTransition {
    pub id: String,
    pub name: String,
}

/// Move an issue to a state named by transition id or name.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub issue_key: String,
    pub transition: String,
    pub fields: Option<Value>,
    pub comment: Option<String>,
}

impl TransitionPlan {
    fn issue_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("issue_key".to_string(), json!(self.issue_key));
        params
    }

    /// `GET /rest/api/2/issue/{issue_key}/transitions`
    pub fn lookup_request(&self) -> Result<RemoteRequest, ArgumentError> {
        Ok(RemoteRequest::from_template(
            Method::Get,
            "/rest/api/2/issue/{issue_key}/transitions",
            &self.issue_params(),
        )?)
    }

    /// Resolve the requested transition by exact, case-sensitive match on id
    /// or name. On a miss the error lists every available name verbatim.
    pub fn resolve(&self, payload: &Value) -> Result<AvailableTransition, ArgumentError> {
        let available = available_transitions(payload);
        if let Some(found) = available
            .iter()
            .find(|t| t.id == self.transition || t.name == self.transition)
        {
            return Ok(found.clone());
        }

        if available.is_empty() {
            return Err(ArgumentError::new(format!(
                "Transition '{}' is not available for {}: the issue has no available transitions",
                self.transition, self.issue_key
            )));
        }
        let names: Vec<&str> = available.iter().map(|t| t.name.as_str()).collect();
        Err(ArgumentError::new(format!(
            "Transition '{}' is not available for {}. Available transitions: {}",
            self.transition,
            self.issue_key,
            names.join(", ")
        )))
    }

    /// `POST /rest/api/2/issue/{issue_key}/transitions`
    pub fn apply_request(&self, target: &AvailableTransition) -> Result<RemoteRequest, ArgumentError> {
        let mut body = json!({ "transition": { "id": target.id } });
        if let Some(fields) = &self.fields {
            body["fields"] = fields.clone();
        }
        if let Some(comment) = &self.comment {
            body["update"] = json!({ "comment": [ { "add": { "body": comment } } ] });
        }
        Ok(RemoteRequest::from_template(
            Method::Post,
            "/rest/api/2/issue/{issue_key}/transitions",
            &self.issue_params(),
        )?
        .with_body(body))
    }
}

fn available_transitions(payload: &Value) -> Vec<AvailableTransition> {
    payload
        .get("transitions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|t| {
                    let id = match t.get("id")? {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        _ => return None,
                    };
                    let name = t.get("name").and_then(Value::as_str).unwrap_or_default();
                    Some(AvailableTransition {
                        id,
                        name: name.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
