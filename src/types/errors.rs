//! Application error types.
//!
//! These are gateway-level errors: startup configuration, transport plumbing
//! and serialization. Remote Jira failures never become an `Error`; they are
//! classified into a `RemoteOutcome::Failure` at the adapter boundary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the gateway.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed input from the MCP client.
    #[error("validation error: {0}")]
    Validation(String),

    /// HTTP client construction failed.
    #[error("http client error: {0}")]
    Http(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// JSON-RPC error code reported to the MCP client.
    pub fn to_rpc_code(&self) -> i64 {
        match self {
            Error::Validation(_) => -32602,
            Error::Serialization(_) => -32700,
            Error::Config(_) | Error::Http(_) | Error::Io(_) => -32603,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}
