//! Core types for the gateway.
//!
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the Jira connection, batching and logging

mod config;
mod errors;

pub use config::{BatchConfig, Config, JiraConfig, ObservabilityConfig};
pub use errors::{Error, Result};
