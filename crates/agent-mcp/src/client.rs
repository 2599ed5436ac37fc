//! MCP client over streamable HTTP.
//!
//! Connects to a tool-hosting service, performs the initialize handshake,
//! discovers the tool catalog and forwards `tools/call` requests. The client
//! implements [`ToolInvoker`] so the orchestration loop can use remote tools
//! exactly like local ones.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use agent_core::error::{AgentError, Result as AgentResult};
use agent_core::extract;
use agent_core::tool::{ToolArguments, ToolDefinition, ToolInvoker, ToolResult};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{McpError, Result};
use crate::sse;
use crate::types::*;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000/mcp";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Upper bound on `tools/list` pages; guards against servers that never stop paging
const MAX_LIST_PAGES: usize = 64;

/// Connection settings
#[derive(Clone, Debug)]
pub struct McpClientConfig {
    /// Endpoint URL, e.g. `http://127.0.0.1:3000/mcp`
    pub server_url: String,

    /// Budget for the whole handshake
    pub connect_timeout: Duration,

    /// Budget for a single request once connected
    pub read_timeout: Duration,

    /// Send an HTTP DELETE for the session on close
    pub terminate_on_close: bool,

    /// Extra headers sent with every request
    pub headers: Vec<(String, String)>,

    /// Name reported in `clientInfo`
    pub client_name: String,
}

impl McpClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            terminate_on_close: true,
            headers: Vec::new(),
            client_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `MCP_SERVER_URL`, `MCP_CONNECT_TIMEOUT_SECS`, `MCP_READ_TIMEOUT_SECS`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("MCP_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let mut config = Self::new(url);

        let secs = |key: &str| -> Result<Option<Duration>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| McpError::InvalidParams(format!("{} must be whole seconds, got {:?}", key, raw)))
                })
                .transpose()
        };

        if let Some(timeout) = secs("MCP_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = secs("MCP_READ_TIMEOUT_SECS")? {
            config.read_timeout = timeout;
        }

        Ok(config)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    session_id: Option<String>,
    server_info: Option<ServerInfo>,
    tools: Vec<ToolInfo>,
    closed: bool,
}

struct Inner {
    http: Client,
    config: McpClientConfig,
    next_id: AtomicI64,
    state: RwLock<SessionState>,
}

/// Handle to one MCP session; clones share the session.
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<Inner>,
}

impl McpClient {
    /// Open a session: initialize, confirm, discover tools.
    pub async fn connect(config: McpClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let client = Self {
            inner: Arc::new(Inner {
                http,
                config,
                next_id: AtomicI64::new(1),
                state: RwLock::new(SessionState::default()),
            }),
        };

        let budget = client.inner.config.connect_timeout;
        tracing::info!(url = %client.inner.config.server_url, "Connecting to MCP server");

        let failure = match tokio::time::timeout(budget, client.handshake()).await {
            Ok(Ok(())) => return Ok(client),
            Ok(Err(e)) => e,
            Err(_) => McpError::Timeout("MCP handshake".into()),
        };

        // Release a half-opened session
        if let Err(e) = client.close().await {
            tracing::debug!(error = %e, "Failed to release session after handshake failure");
        }
        Err(failure)
    }

    async fn handshake(&self) -> Result<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: self.inner.config.client_name.clone(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        };

        let id = self.next_id();
        let request = JsonRpcRequest::new(id.clone(), "initialize", Some(serde_json::to_value(params)?));
        let response = self.post(&request, self.inner.config.connect_timeout).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let result: InitializeResult = serde_json::from_value(Self::read_result(response, &id).await?)?;
        if result.protocol_version != PROTOCOL_VERSION {
            tracing::warn!(
                server = %result.protocol_version,
                client = PROTOCOL_VERSION,
                "Server negotiated a different protocol version"
            );
        }

        {
            let mut state = self.write_state();
            state.session_id = session_id;
            state.server_info = Some(result.server_info);
        }

        self.notify("notifications/initialized").await?;

        let tools = self.list_tools().await?;
        tracing::info!(count = tools.len(), "Tool discovery complete");
        self.write_state().tools = tools;

        Ok(())
    }

    /// Page through `tools/list`
    async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = serde_json::to_value(ListToolsParams {
                cursor: cursor.clone(),
            })?;
            let page: ListToolsResult =
                serde_json::from_value(self.request("tools/list", Some(params), self.inner.config.connect_timeout).await?)?;

            for tool in page.tools {
                tracing::debug!(name = %tool.name, "Discovered tool");
                tools.push(tool);
            }

            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        tracing::warn!(pages = MAX_LIST_PAGES, "Stopped paging tools/list");
        Ok(tools)
    }

    /// Call a tool and return the raw `tools/call` result.
    pub async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> Result<Value> {
        self.ensure_open()?;
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        self.request("tools/call", Some(params), self.inner.config.read_timeout).await
    }

    /// End the session. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        let session_id = {
            let mut state = self.write_state();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.session_id.take()
        };

        let Some(session_id) = session_id else {
            return Ok(());
        };
        if !self.inner.config.terminate_on_close {
            return Ok(());
        }

        let mut request = self
            .inner
            .http
            .delete(&self.inner.config.server_url)
            .header(SESSION_HEADER, &session_id)
            .timeout(self.inner.config.connect_timeout);
        for (name, value) in &self.inner.config.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        match response.status() {
            s if s.is_success() => tracing::debug!(session = %session_id, "Session terminated"),
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => {
                tracing::debug!(status = %response.status(), "Server did not terminate session")
            }
            status => {
                return Err(McpError::Status {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Discovered tools, in server order
    pub fn tools(&self) -> Vec<ToolInfo> {
        self.read_state().tools.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.read_state().session_id.clone()
    }

    pub fn server_info(&self) -> Option<ServerInfo> {
        self.read_state().server_info.clone()
    }

    pub fn is_open(&self) -> bool {
        !self.read_state().closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.read_state().closed {
            return Err(McpError::NotConnected("session is closed".into()));
        }
        Ok(())
    }

    fn has_tool(&self, name: &str) -> bool {
        self.read_state().tools.iter().any(|t| t.name == name)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> RpcId {
        RpcId::Number(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn request(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value> {
        let id = self.next_id();
        tracing::debug!(method = %method, id = ?id, "Sending request");

        let request = JsonRpcRequest::new(id.clone(), method, params);
        let response = self.post(&request, timeout).await?;
        Self::read_result(response, &id).await
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let notification = JsonRpcNotification::new(method, None);
        self.post(&notification, self.inner.config.connect_timeout).await?;
        Ok(())
    }

    async fn post<T: Serialize>(&self, body: &T, timeout: Duration) -> Result<Response> {
        let session_id = self.session_id();

        let mut request = self
            .inner
            .http
            .post(&self.inner.config.server_url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body)
            .timeout(timeout);
        if let Some(session_id) = &session_id {
            request = request.header(SESSION_HEADER, session_id);
        }
        for (name, value) in &self.inner.config.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(session_id) = session_id {
                self.write_state().closed = true;
                return Err(McpError::SessionExpired(session_id));
            }
        }

        Err(McpError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    /// Pull the JSON-RPC response for `id` out of a plain or event-stream body
    async fn read_result(response: Response, id: &RpcId) -> Result<Value> {
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let rpc: JsonRpcResponse = if is_stream {
            let body = response.text().await?;
            sse::find_response(&body, id)?.ok_or_else(|| McpError::MissingResponse(format!("{:?}", id)))?
        } else {
            response.json().await?
        };

        if let Some(err) = rpc.error {
            return Err(McpError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        rpc.result
            .ok_or_else(|| McpError::MissingResponse(format!("{:?}", id)))
    }
}

#[async_trait]
impl ToolInvoker for McpClient {
    fn catalog(&self) -> Vec<ToolDefinition> {
        self.tools().into_iter().map(ToolDefinition::from).collect()
    }

    async fn invoke(&self, name: &str, arguments: &ToolArguments) -> AgentResult<ToolResult> {
        if !self.is_open() {
            return Err(AgentError::ToolUnavailable("MCP session is closed".into()));
        }
        if !self.has_tool(name) {
            return Err(AgentError::UnknownTool(name.to_string()));
        }

        let raw = self
            .call_tool(name, arguments)
            .await
            .map_err(McpError::into_call_failure)?;
        Ok(extract(&raw))
    }
}

/// Run `f` inside one MCP session; the session is closed however `f` ends.
pub async fn with_session<F, Fut, T, E>(config: McpClientConfig, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(McpClient) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<McpError>,
{
    let client = McpClient::connect(config).await?;
    let outcome = f(client.clone()).await;

    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "Failed to close MCP session");
    }
    outcome
}
