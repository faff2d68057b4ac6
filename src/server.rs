//! MCP server over line-delimited JSON-RPC (stdio)

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::rpc_codes;
use crate::protocol::{
    Info, InitializeParams, InitializeResult, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse,
    RequestId, ServerCapabilities, ToolsCallParams, ToolsCapability, ToolsListResult,
    negotiate_version,
};
use crate::tools::Toolbox;
use crate::{Error, Result};

/// Server name reported in `initialize`
pub const SERVER_NAME: &str = "apisix-mcp";

const INSTRUCTIONS: &str = "Manage an Apache APISIX gateway through its Admin API. \
    Use get_resource to inspect resources, create_or_update_* and patch_* to change them, \
    delete_resource to remove them, and send_request_to_gateway to exercise routes.";

/// JSON-RPC front end over a [`Toolbox`]
#[derive(Clone)]
pub struct Server {
    toolbox: Toolbox,
}

impl Server {
    /// Create a server
    pub fn new(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }

    /// Serve stdin/stdout until stdin closes
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve one message per line from `reader`, writing one response per
    /// line to `writer`. Returns at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.toolbox.specs().len(), "MCP server listening on stdio");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
            }
        }
        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one raw line. `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!(error = %e, "Unparseable message");
                Some(JsonRpcResponse::error(
                    None,
                    rpc_codes::PARSE_ERROR,
                    format!("Parse error: {e}"),
                ))
            }
        }
    }

    /// Handle one decoded message. `None` for notifications.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value
            .get("id")
            .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());

        if value.get("jsonrpc").and_then(Value::as_str) != Some("2.0")
            || !value.get("method").is_some_and(Value::is_string)
        {
            return Some(JsonRpcResponse::error(
                id,
                rpc_codes::INVALID_REQUEST,
                "Invalid Request: expected a JSON-RPC 2.0 message with a method",
            ));
        }

        match serde_json::from_value::<JsonRpcMessage>(value) {
            Ok(JsonRpcMessage::Request(request)) => Some(self.handle_request(request).await),
            Ok(JsonRpcMessage::Notification(notification)) => {
                debug!(method = %notification.method, "Notification");
                None
            }
            Err(e) => Some(JsonRpcResponse::error(
                id,
                rpc_codes::INVALID_REQUEST,
                format!("Invalid Request: {e}"),
            )),
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        debug!(method = %method, id = %id, "Request");

        let result = match method.as_str() {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => self.tools_list(),
            "tools/call" => self.tools_call(params).await,
            _ => Err(Error::json_rpc(
                rpc_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(Some(id), e.to_rpc_code(), e.to_string()),
        }
    }

    #[allow(clippy::unused_self)]
    fn initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| {
                Error::json_rpc(rpc_codes::INVALID_PARAMS, format!("Invalid params: {e}"))
            })?,
            None => InitializeParams::default(),
        };
        let version = negotiate_version(params.protocol_version.as_deref());
        info!(
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            requested = params.protocol_version.as_deref().unwrap_or("-"),
            negotiated = version,
            "Client initialized"
        );

        let result = InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: Info {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("APISIX Admin API".to_string()),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn tools_list(&self) -> Result<Value> {
        let result = ToolsListResult {
            tools: self.toolbox.tools(),
            next_cursor: None,
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn tools_call(&self, params: Option<Value>) -> Result<Value> {
        let params: ToolsCallParams = params
            .ok_or_else(|| Error::json_rpc(rpc_codes::INVALID_PARAMS, "Missing params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    Error::json_rpc(rpc_codes::INVALID_PARAMS, format!("Invalid params: {e}"))
                })
            })?;
        let result = self.toolbox.call(&params.name, params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}
