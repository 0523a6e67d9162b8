//! Configuration structures.
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then CLI flags / environment variables applied by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::errors::{Error, Result};

/// Global gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream Jira connection.
    #[serde(default)]
    pub jira: JiraConfig,

    /// Batch execution tuning.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load a JSON config file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Reject configurations the gateway cannot start with.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.jira.base_url.trim();
        if base_url.is_empty() {
            return Err(Error::config(
                "Jira base URL is not set (use --base-url or JIRA_BASE_URL)",
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::config(format!(
                "Jira base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        if self.jira.api_token.trim().is_empty() {
            return Err(Error::config(
                "Jira API token is not set (use --token or JIRA_API_TOKEN)",
            ));
        }
        if self.jira.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than zero"));
        }
        if self.batch.max_concurrency == Some(0) {
            return Err(Error::config("batch concurrency cap must be at least 1"));
        }
        Ok(())
    }
}

/// Upstream Jira connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Base URL of the Jira server, e.g. `https://jira.example.com`.
    pub base_url: String,

    /// Static bearer credential (personal access token).
    pub api_token: String,

    /// Budget for a single remote call, connect through body read.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Accept self-signed or otherwise unverifiable TLS certificates.
    ///
    /// On by default: private Jira deployments commonly run on internal CAs.
    /// This disables server authentication; turn it off for public endpoints.
    pub accept_invalid_certs: bool,

    /// User-Agent header sent upstream.
    pub user_agent: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: String::new(),
            request_timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
            user_agent: format!("jira-gateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// Hand-written so the token never reaches logs.
impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Batch execution tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum in-flight calls per batch. `None` launches every item at once.
    ///
    /// Jira rate limits are deployment-specific, so this stays opt-in.
    pub max_concurrency: Option<usize>,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
