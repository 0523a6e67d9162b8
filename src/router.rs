//! Tool dispatch router.
//!
//! Single entry point for tool listing and invocation. Every invocation goes
//! through the same pipeline:
//!
//! ```text
//! gate ─▶ lookup ─▶ validate + defaults ─▶ plan ─▶ execute ─▶ envelope
//! ```
//!
//! Remote failures never escape as errors of the router itself; they come
//! back as `ToolError::Remote` and are rendered into the uniform envelope.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::batch::{BatchEngine, BatchSummary};
use crate::gate::{ConnectionGate, ValidationState};
use crate::remote::{describe, Failure, RemoteCall};
use crate::tools::{Plan, ToolArgs, ToolCatalog, TransitionPlan};
use crate::types::{Config, Result};

// =============================================================================
// Errors
// =============================================================================

/// Why a tool invocation did not produce a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("{}", describe(.0).human_message())]
    Remote(Failure),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    #[error("Jira connection unavailable: {0}")]
    ConnectionUnavailable(String),
}

impl ToolError {
    /// Taxonomy label: an `ErrorKind` name or one of the gateway kinds.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Remote(failure) => failure.kind.as_str(),
            ToolError::InvalidArguments(_) => "CallerArgumentError",
            ToolError::UnknownOperation(_) => "UnknownOperation",
            ToolError::ConnectionUnavailable(_) => "ConnectionUnavailable",
        }
    }

    pub fn details(&self) -> String {
        match self {
            ToolError::Remote(failure) => failure.message.clone(),
            ToolError::InvalidArguments(msg) => msg.clone(),
            ToolError::UnknownOperation(name) => format!("No tool named '{}'", name),
            ToolError::ConnectionUnavailable(reason) => reason.clone(),
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            ToolError::Remote(failure) => describe(failure).suggestion,
            ToolError::InvalidArguments(_) => {
                "Check the arguments against the tool's input schema and retry."
            }
            ToolError::UnknownOperation(_) => "Call tools/list to see the available tools.",
            ToolError::ConnectionUnavailable(_) => {
                "Fix JIRA_BASE_URL and JIRA_API_TOKEN, then restart the gateway."
            }
        }
    }

    /// `{error, tool, details, suggestion}` failure object.
    pub fn envelope(&self, tool: &str) -> Value {
        let mut envelope = json!({
            "error": self.kind(),
            "tool": tool,
            "details": self.details(),
            "suggestion": self.suggestion(),
        });
        if let ToolError::Remote(Failure {
            status: Some(status),
            ..
        }) = self
        {
            envelope["status"] = json!(status);
        }
        envelope
    }
}

// =============================================================================
// Result envelope
// =============================================================================

/// One text content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

/// MCP `tools/call` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(payload: &Value) -> Self {
        Self::text(payload, false)
    }

    pub fn failure(tool: &str, error: &ToolError) -> Self {
        Self::text(&error.envelope(tool), true)
    }

    pub fn from_result(tool: &str, result: &std::result::Result<Value, ToolError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(error) => Self::failure(tool, error),
        }
    }

    fn text(value: &Value, is_error: bool) -> Self {
        Self {
            content: vec![ContentBlock {
                content_type: "text",
                text: value.to_string(),
            }],
            is_error,
        }
    }

    /// Parse the text payload back into JSON.
    pub fn payload(&self) -> Option<Value> {
        self.content
            .first()
            .and_then(|block| serde_json::from_str(&block.text).ok())
    }
}

// =============================================================================
// Router
// =============================================================================

/// Owns the catalog, the gate and the execution engines.
pub struct ToolRouter {
    catalog: ToolCatalog,
    gate: ConnectionGate,
    remote: Arc<dyn RemoteCall>,
    batch: BatchEngine,
    budget: Duration,
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("tools", &self.catalog.len())
            .field("gate", &self.gate)
            .field("batch", &self.batch)
            .field("budget", &self.budget)
            .finish()
    }
}

impl ToolRouter {
    pub fn new(
        remote: Arc<dyn RemoteCall>,
        budget: Duration,
        max_concurrency: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            catalog: ToolCatalog::jira()?,
            gate: ConnectionGate::new(remote.clone(), budget),
            batch: BatchEngine::new(remote.clone(), budget, max_concurrency),
            remote,
            budget,
        })
    }

    pub fn from_config(remote: Arc<dyn RemoteCall>, config: &Config) -> Result<Self> {
        Self::new(
            remote,
            config.jira.request_timeout,
            config.batch.max_concurrency,
        )
    }

    pub fn gate(&self) -> &ConnectionGate {
        &self.gate
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// MCP tool entries, or none at all when the connection is invalid.
    pub async fn list_tools(&self) -> Vec<Value> {
        match self.gate.ensure_validated().await {
            ValidationState::Valid(_) => self
                .catalog
                .list_entries()
                .into_iter()
                .map(|entry| entry.to_mcp())
                .collect(),
            state => {
                tracing::debug!(?state, "tool catalog withheld");
                Vec::new()
            }
        }
    }

    /// Invoke a tool and render the envelope.
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> ToolOutcome {
        ToolOutcome::from_result(name, &self.execute(name, arguments).await)
    }

    /// Invoke a tool and return the raw result.
    pub async fn execute(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> std::result::Result<Value, ToolError> {
        let result = self.dispatch(name, arguments).await;
        match &result {
            Ok(_) => tracing::info!(tool = name, "tool call succeeded"),
            Err(e) => tracing::warn!(tool = name, kind = e.kind(), "tool call failed: {}", e),
        }
        result
    }

    async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> std::result::Result<Value, ToolError> {
        // Static lookup first: an unknown name never costs a probe.
        let entry = self
            .catalog
            .get(name)
            .ok_or_else(|| ToolError::UnknownOperation(name.to_string()))?;

        if let ValidationState::Invalid(reason) = self.gate.ensure_validated().await {
            return Err(ToolError::ConnectionUnavailable(reason.clone()));
        }

        let mut params = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(ToolError::InvalidArguments(
                    "arguments must be a JSON object".to_string(),
                ))
            }
        };

        let problems = self
            .catalog
            .validate_params(name, &params)
            .map_err(|_| ToolError::UnknownOperation(name.to_string()))?;
        if !problems.is_empty() {
            return Err(ToolError::InvalidArguments(problems.join("; ")));
        }
        self.catalog
            .fill_defaults(name, &mut params)
            .map_err(|_| ToolError::UnknownOperation(name.to_string()))?;

        let plan = entry
            .tool
            .plan(&ToolArgs::new(params))
            .map_err(|e| ToolError::InvalidArguments(e.0))?;

        let payload = self.run(plan).await?;
        Ok(match payload {
            Value::Null => json!({ "success": true }),
            other => other,
        })
    }

    async fn run(&self, plan: Plan) -> std::result::Result<Value, ToolError> {
        match plan {
            Plan::Single { request, shape } => self
                .remote
                .call(&request, self.budget)
                .await
                .into_result()
                .map(|payload| shape.apply(payload))
                .map_err(ToolError::Remote),
            Plan::Batch(items) => {
                let results = self.batch.run_batch(items).await;
                let summary = BatchSummary::from_results(&results);
                Ok(json!({
                    "total": summary.total,
                    "succeeded": summary.succeeded,
                    "failed": summary.failed,
                    "results": summary.results,
                }))
            }
            Plan::Transition(transition) => self.run_transition(&transition).await,
        }
    }

    /// Look up the available transitions, then perform the matching one.
    async fn run_transition(
        &self,
        plan: &TransitionPlan,
    ) -> std::result::Result<Value, ToolError> {
        let invalid = |e: crate::tools::ArgumentError| ToolError::InvalidArguments(e.0);

        let lookup = plan.lookup_request().map_err(invalid)?;
        let available = self
            .remote
            .call(&lookup, self.budget)
            .await
            .into_result()
            .map_err(ToolError::Remote)?;

        let target = plan.resolve(&available).map_err(invalid)?;
        tracing::debug!(issue = %plan.issue_key, transition_id = %target.id, "transition resolved");

        let apply = plan.apply_request(&target).map_err(invalid)?;
        self.remote
            .call(&apply, self.budget)
            .await
            .into_result()
            .map_err(ToolError::Remote)?;

        Ok(json!({
            "success": true,
            "issue_key": plan.issue_key,
            "transition": target,
        }))
    }
}
