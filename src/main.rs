//! Jira MCP gateway — stdio entry point.
//!
//! Reads newline-delimited JSON-RPC on stdin, writes responses on stdout and
//! logs to stderr. Missing connection settings are fatal before any I/O.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use jira_gateway::mcp::McpServer;
use jira_gateway::observability::init_tracing;
use jira_gateway::remote::JiraClient;
use jira_gateway::router::ToolRouter;
use jira_gateway::Config;

#[derive(Parser, Debug)]
#[command(name = "jira-mcp")]
#[command(version, about = "MCP tool gateway for a Jira server")]
struct Cli {
    /// JSON config file; flags and environment override its values
    #[arg(long, env = "JIRA_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the Jira server
    #[arg(long, env = "JIRA_BASE_URL")]
    base_url: Option<String>,

    /// Personal access token sent as a bearer credential
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Budget for a single remote call, e.g. 30s or 1m
    #[arg(long, env = "JIRA_TIMEOUT", value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Accept unverifiable TLS certificates (true/false)
    #[arg(long, env = "JIRA_ACCEPT_INVALID_CERTS")]
    accept_invalid_certs: Option<bool>,

    /// Maximum in-flight calls per batch tool
    #[arg(long, env = "JIRA_BATCH_CONCURRENCY")]
    batch_concurrency: Option<usize>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

impl Cli {
    /// Defaults, then the config file, then flags and environment.
    fn load_config(&self) -> jira_gateway::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.jira.base_url = base_url.clone();
        }
        if let Some(token) = &self.token {
            config.jira.api_token = token.clone();
        }
        if let Some(timeout) = self.timeout {
            config.jira.request_timeout = timeout;
        }
        if let Some(accept) = self.accept_invalid_certs {
            config.jira.accept_invalid_certs = accept;
        }
        if let Some(cap) = self.batch_concurrency {
            config.batch.max_concurrency = Some(cap);
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if self.json_logs {
            config.observability.json_logs = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("jira-mcp: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.observability);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("gateway stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> jira_gateway::Result<()> {
    let client = JiraClient::new(&config.jira)?;
    let router = ToolRouter::from_config(Arc::new(client), &config)?;
    tracing::info!(
        base_url = %config.jira.base_url,
        tools = router.catalog().len(),
        "Jira gateway starting"
    );

    let server = McpServer::new(Arc::new(router));
    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            cancel.cancel();
        }
    });

    server.serve_stdio().await?;
    Ok(())
}
