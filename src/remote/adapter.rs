//! Remote call adapter — one HTTP request against Jira, classified.
//!
//! Transport policy:
//! - bearer credential on every request
//! - redirects are never followed; a 3xx is an `UpstreamError` naming the target
//! - any 2xx is a transport-level success, body passed through
//! - every call is bounded by a timeout budget
//! - TLS verification follows `JiraConfig::accept_invalid_certs`
//!
//! Classification order: HTTP status >= 400 (or a redirect), then timeout, then
//! "sent but no response", then everything else.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::outcome::{ErrorKind, Failure, RemoteOutcome};
use super::request::{Method, RemoteRequest};
use crate::types::{Error, JiraConfig, Result};

/// Seam between the gateway and the remote service.
///
/// Implementations must never panic or return early errors: every problem is
/// reported as a classified `RemoteOutcome::Failure`.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn call(&self, request: &RemoteRequest, budget: Duration) -> RemoteOutcome;
}

/// HTTP adapter for a Jira server.
///
/// Created once at startup; the underlying `reqwest::Client` keeps a
/// connection pool.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| Error::config(format!("invalid Jira base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Jira base URL cannot carry a path: {}",
                base_url
            )));
        }

        if config.accept_invalid_certs {
            tracing::warn!(
                base_url = %base_url,
                "TLS certificate verification is disabled for the Jira connection"
            );
        }

        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::http(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: config.api_token.clone(),
        })
    }

    /// Full URL for a request: base path + encoded segments + query.
    fn url(&self, request: &RemoteRequest) -> std::result::Result<Url, String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(request.segments());
        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query());
        }
        Ok(url)
    }

    async fn send(&self, request: &RemoteRequest, budget: Duration, call_id: Uuid) -> RemoteOutcome {
        let url = match self.url(request) {
            Ok(url) => url,
            Err(msg) => return RemoteOutcome::failure(ErrorKind::Unknown, msg),
        };

        let mut builder = self
            .http
            .request(http_method(request.method()), url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header("X-Request-Id", call_id.to_string())
            .timeout(budget);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return RemoteOutcome::Failure(classify_transport_error(request, &e)),
        };

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            tracing::warn!(
                %call_id,
                status = status.as_u16(),
                location = ?location,
                "Jira answered with a redirect; check the configured base URL"
            );
            return RemoteOutcome::Failure(Failure::redirect(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                location.as_deref(),
            ));
        }

        if status.as_u16() >= 400 {
            // Status decides the kind even if the error body cannot be read.
            let body = response.text().await.unwrap_or_default();
            return RemoteOutcome::Failure(Failure::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &body,
            ));
        }

        match response.text().await {
            Ok(body) => RemoteOutcome::Success(parse_payload(&body)),
            Err(e) => RemoteOutcome::Failure(classify_transport_error(request, &e)),
        }
    }
}

#[async_trait]
impl RemoteCall for JiraClient {
    async fn call(&self, request: &RemoteRequest, budget: Duration) -> RemoteOutcome {
        let call_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::debug!(%call_id, method = %request.method(), path = %request.path(), "remote call");

        let outcome = match tokio::time::timeout(budget, self.send(request, budget, call_id)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => RemoteOutcome::Failure(timeout_failure(request, budget)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            RemoteOutcome::Success(_) => {
                tracing::debug!(%call_id, %request, elapsed_ms, "remote call succeeded");
            }
            RemoteOutcome::Failure(failure) => {
                tracing::warn!(
                    %call_id,
                    %request,
                    elapsed_ms,
                    kind = %failure.kind,
                    status = failure.status,
                    "remote call failed: {}",
                    failure.message
                );
            }
        }
        outcome
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn timeout_failure(request: &RemoteRequest, budget: Duration) -> Failure {
    Failure::new(
        ErrorKind::Timeout,
        format!(
            "{} did not complete within {}ms",
            request,
            budget.as_millis()
        ),
    )
}

/// Classify a reqwest error for a call that produced no usable response.
fn classify_transport_error(request: &RemoteRequest, err: &reqwest::Error) -> Failure {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_builder() {
        ErrorKind::Unknown
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::Unreachable
    } else {
        ErrorKind::Unknown
    };
    Failure::new(kind, format!("{}: {}", request, error_chain(err)))
}

/// Render an error and its sources as one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = inner.source();
    }
    rendered
}

/// Body of a successful response: JSON when it parses, raw text otherwise,
/// `null` when empty.
fn parse_payload(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
