//! MCP stdio server: read loop, request handling and the single writer.
//!
//! Requests are read one line at a time. `tools/list` and `tools/call` run on
//! their own tasks so a slow Jira call never blocks the read loop; responses
//! funnel through one writer task, so lines never interleave.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::mcp::codec::{read_message, write_message, DEFAULT_MAX_MESSAGE_BYTES};
use crate::mcp::protocol::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams,
    INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::router::{ToolError, ToolOutcome, ToolRouter};
use crate::types::Error;

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const RESPONSE_QUEUE: usize = 64;

/// MCP server wrapping the tool router.
#[derive(Debug)]
pub struct McpServer {
    router: Arc<ToolRouter>,
    cancel: CancellationToken,
    max_message_bytes: usize,
    write_timeout: Duration,
}

impl McpServer {
    pub fn new(router: Arc<ToolRouter>) -> Self {
        Self {
            router,
            cancel: CancellationToken::new(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Token that stops the server when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown. In-flight tool calls are aborted.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Serve on the process's stdin/stdout.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until EOF on `reader` or cancellation.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(reader);
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE);
        let writer_task = tokio::spawn(write_responses(writer, rx, self.write_timeout));
        let mut tasks = JoinSet::new();

        tracing::info!(
            "MCP server ready (max_message_bytes={})",
            self.max_message_bytes
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("MCP server shutting down");
                    tasks.abort_all();
                    break;
                }
                message = read_message(&mut reader, self.max_message_bytes) => {
                    let line = match message {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            tracing::info!("stdin closed, MCP server stopping");
                            break;
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                            let response = JsonRpcResponse::failure(
                                Value::Null,
                                JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                            );
                            if tx.send(response).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        Err(e) => return Err(e),
                    };

                    let request = match parse_request(&line) {
                        Ok(request) => request,
                        Err(response) => {
                            if tx.send(response).await.is_err() {
                                break;
                            }
                            continue;
                        }
                    };

                    tracing::debug!(method = %request.method, "request received");
                    let router = self.router.clone();
                    let tx = tx.clone();
                    if matches!(request.method.as_str(), "tools/list" | "tools/call") {
                        tasks.spawn(async move {
                            if let Some(response) = handle_request(&router, request).await {
                                let _ = tx.send(response).await;
                            }
                        });
                    } else if let Some(response) = handle_request(&router, request).await {
                        if tx.send(response).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // Reap finished handlers.
            while tasks.try_join_next().is_some() {}
        }

        while tasks.join_next().await.is_some() {}
        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }
}

/// Drain the response queue onto the writer.
async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
    write_timeout: Duration,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(response) = rx.recv().await {
        timed_write(&mut writer, &response, write_timeout).await?;
    }
    Ok(())
}

/// Write a message with a timeout so a stalled client cannot wedge the server.
async fn timed_write<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
    timeout: Duration,
) -> std::io::Result<()> {
    tokio::time::timeout(timeout, write_message(writer, response))
        .await
        .map_err(|_| {
            tracing::warn!("Write timeout ({}s), stopping writer", timeout.as_secs());
            std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout")
        })?
}

/// Parse one line into a request, or the error response to send back.
fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
        )
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::failure(
            id.clone(),
            JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
        )
    })?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::failure(
            id,
            JsonRpcError::new(INVALID_REQUEST, "Invalid request: jsonrpc must be \"2.0\""),
        ));
    }
    Ok(request)
}

/// Handle one request. Notifications produce no response.
async fn handle_request(router: &ToolRouter, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let JsonRpcRequest {
        id, method, params, ..
    } = request;

    let result = match method.as_str() {
        "initialize" => serde_json::to_value(InitializeResult::gateway())
            .map_err(|e| JsonRpcError::from(Error::from(e))),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": router.list_tools().await })),
        "tools/call" => call_tool(router, params).await,
        notification if notification.starts_with("notifications/") => {
            tracing::debug!(method = notification, "notification received");
            return None;
        }
        other => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    };

    let id = id?;
    Some(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => JsonRpcResponse::failure(id, error),
    })
}

async fn call_tool(router: &ToolRouter, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| Error::validation(format!("Invalid tools/call params: {}", e)))?;

    let result = router.execute(&params.name, params.arguments).await;
    if let Err(error @ ToolError::UnknownOperation(_)) = &result {
        return Err(JsonRpcError::new(METHOD_NOT_FOUND, error.to_string())
            .with_data(error.envelope(&params.name)));
    }

    let outcome = ToolOutcome::from_result(&params.name, &result);
    Ok(serde_json::to_value(&outcome).map_err(Error::from)?)
}
