//! Classified result of a single remote call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Maximum number of body characters carried in a failure message.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Closed set of remote failure kinds.
///
/// Assigned once by the adapter from the raw transport/HTTP signal and never
/// re-derived from message text downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Unreachable,
    Timeout,
    UpstreamError,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::Unreachable,
        ErrorKind::Timeout,
        ErrorKind::UpstreamError,
        ErrorKind::Unknown,
    ];

    /// Kind for an HTTP status of 400 or above.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            _ => ErrorKind::UpstreamError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unreachable => "Unreachable",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure half of a `RemoteOutcome`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Failure for a received response with status >= 400.
    ///
    /// The message carries the status code, the reason phrase and at most
    /// `BODY_EXCERPT_CHARS` characters of the response body.
    pub fn from_response(status: u16, reason: &str, body: &str) -> Self {
        let excerpt = excerpt(body, BODY_EXCERPT_CHARS);
        let message = if excerpt.is_empty() {
            format!("HTTP {} {}", status, reason)
        } else {
            format!("HTTP {} {}: {}", status, reason, excerpt)
        };
        Self {
            kind: ErrorKind::from_status(status),
            message,
            status: Some(status),
        }
    }
}

impl Failure {
    /// Failure for a 3xx answer. Redirects are never followed, so the
    /// configured base URL is likely wrong.
    pub fn redirect(status: u16, reason: &str, location: Option<&str>) -> Self {
        let target = location.unwrap_or("an unspecified location");
        Self {
            kind: ErrorKind::UpstreamError,
            message: format!("HTTP {} {}: redirected to {}", status, reason, target),
            status: Some(status),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of one remote call: a payload or a classified failure, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Success(Value),
    Failure(Failure),
}

impl RemoteOutcome {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure(Failure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Value, Failure> {
        match self {
            RemoteOutcome::Success(value) => Ok(value),
            RemoteOutcome::Failure(failure) => Err(failure),
        }
    }
}

/// First `max_chars` characters of `body`, trimmed, on a char boundary.
fn excerpt(body: &str, max_chars: usize) -> &str {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
