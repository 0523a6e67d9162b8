//! Connection validation gate.
//!
//! One identity probe per process, made lazily by whichever caller needs the
//! verdict first. The verdict is frozen in a single-assignment cell:
//!
//! ```text
//! Unvalidated ──probe ok──▶ Valid(identity)
//!      │
//!      └──probe failed──▶ Invalid(reason)
//! ```
//!
//! Concurrent first callers wait on the same initialization, so exactly one
//! probe request is sent.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::remote::{describe, Method, RemoteCall, RemoteOutcome, RemoteRequest};

/// Lightweight "who am I" endpoint used as the probe.
pub const PROBE_PATH: &str = "/rest/api/2/myself";

/// Connection verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationState {
    Unvalidated,
    Valid(String),
    Invalid(String),
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationState::Valid(_))
    }
}

/// Process-lifetime, one-shot connection gate.
pub struct ConnectionGate {
    remote: Arc<dyn RemoteCall>,
    budget: Duration,
    state: OnceCell<ValidationState>,
}

impl std::fmt::Debug for ConnectionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGate")
            .field("budget", &self.budget)
            .field("state", &self.state.get())
            .finish()
    }
}

impl ConnectionGate {
    pub fn new(remote: Arc<dyn RemoteCall>, budget: Duration) -> Self {
        Self {
            remote,
            budget,
            state: OnceCell::new(),
        }
    }

    /// Current state without probing.
    pub fn state(&self) -> ValidationState {
        self.state
            .get()
            .cloned()
            .unwrap_or(ValidationState::Unvalidated)
    }

    /// Probe on first use, then return the frozen verdict.
    pub async fn ensure_validated(&self) -> &ValidationState {
        self.state.get_or_init(|| self.probe()).await
    }

    async fn probe(&self) -> ValidationState {
        let request = RemoteRequest::new(Method::Get, PROBE_PATH);
        match self.remote.call(&request, self.budget).await {
            RemoteOutcome::Success(payload) => {
                let identity = identity_label(&payload);
                tracing::info!(identity = %identity, "Jira connection validated");
                ValidationState::Valid(identity)
            }
            RemoteOutcome::Failure(failure) => {
                let reason = describe(&failure).human_message();
                tracing::warn!(kind = %failure.kind, "Jira connection invalid, tool catalog disabled: {}", reason);
                ValidationState::Invalid(reason)
            }
        }
    }
}

/// Human-readable identity from a `/myself` payload.
fn identity_label(payload: &Value) -> String {
    ["displayName", "name", "emailAddress", "accountId"]
        .iter()
        .filter_map(|field| payload.get(*field).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "authenticated user".to_string())
}
