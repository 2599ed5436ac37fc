//! MCP server over streamable HTTP.
//!
//! Hosts any [`ToolInvoker`] behind `POST /mcp` (JSON-RPC messages) and
//! `DELETE /mcp` (session termination). `initialize` issues a session id;
//! every later message must carry it in the `mcp-session-id` header.
//! Sessions idle for longer than the session TTL are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use agent_core::tool::{ToolArguments, ToolInvoker};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::McpError;
use crate::types::*;

/// Idle time after which a session is forgotten
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// MCP server bridging a tool invoker to remote clients.
pub struct McpServer {
    tools: Arc<dyn ToolInvoker>,
    info: ServerInfo,
    instructions: Option<String>,
    page_size: Option<usize>,
    session_ttl: Duration,
    /// Session id -> last time a message carried it
    sessions: Mutex<HashMap<String, Instant>>,
}

impl McpServer {
    pub fn new(tools: Arc<dyn ToolInvoker>) -> Self {
        Self {
            tools,
            info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            instructions: None,
            page_size: None,
            session_ttl: DEFAULT_SESSION_TTL,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.name = name.into();
        self
    }

    /// Usage hints returned from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Split `tools/list` into pages of `size` tools.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Forget sessions that carry no message for `ttl`.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.live_sessions().len()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session table with idle entries already dropped
    fn live_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        let ttl = self.session_ttl;
        let mut sessions = self.sessions();
        sessions.retain(|id, last_seen| {
            let live = last_seen.elapsed() < ttl;
            if !live {
                tracing::info!(session = %id, "MCP session expired");
            }
            live
        });
        sessions
    }

    fn open_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.live_sessions().insert(id.clone(), Instant::now());
        tracing::info!(session = %id, "MCP session opened");
        id
    }

    /// Refresh a live session; false when it is unknown or expired
    fn touch_session(&self, id: &str) -> bool {
        match self.live_sessions().get_mut(id) {
            Some(last_seen) => {
                *last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    fn initialize(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        if let Some(client) = params
            .as_ref()
            .and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok())
        {
            tracing::debug!(
                client = %client.client_info.name,
                version = %client.protocol_version,
                "Handling initialize"
            );
        }

        reply(
            id,
            InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability { list_changed: false }),
                },
                server_info: self.info.clone(),
                instructions: self.instructions.clone(),
            },
        )
    }

    /// Handle a request inside an established session.
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "tools/list" => self.handle_list_tools(id, &request.params),
            "tools/call" => self.handle_call_tool(id, &request.params).await,
            "ping" => JsonRpcResponse::success(id, json!({})),
            method => {
                tracing::warn!(method = %method, "Unknown method");
                error_reply(id, &McpError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => tracing::debug!("Client confirmed initialization"),
            "notifications/cancelled" => tracing::debug!("Client cancelled a request"),
            method => tracing::debug!(method = %method, "Unknown notification, ignoring"),
        }
    }

    fn handle_list_tools(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        let params: ListToolsParams = match params {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(p) => p,
                Err(e) => return error_reply(id, &McpError::InvalidParams(e.to_string())),
            },
            None => ListToolsParams::default(),
        };

        let catalog: Vec<ToolInfo> = self.tools.catalog().into_iter().map(ToolInfo::from).collect();

        let start = match params.cursor.as_deref().map(str::parse::<usize>) {
            None => 0,
            Some(Ok(start)) if start <= catalog.len() => start,
            Some(_) => return error_reply(id, &McpError::InvalidParams("Invalid cursor".into())),
        };
        let end = self
            .page_size
            .map_or(catalog.len(), |size| (start + size).min(catalog.len()));

        reply(
            id,
            ListToolsResult {
                tools: catalog[start..end].to_vec(),
                next_cursor: (end < catalog.len()).then(|| end.to_string()),
            },
        )
    }

    async fn handle_call_tool(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return error_reply(id, &McpError::InvalidParams("missing params".into()));
        };

        let call: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(call) => call,
            Err(e) => return error_reply(id, &McpError::InvalidParams(e.to_string())),
        };

        let arguments: ToolArguments = match call.arguments {
            Value::Object(map) => map,
            Value::Null => ToolArguments::new(),
            other => {
                return error_reply(
                    id,
                    &McpError::InvalidParams(format!("arguments must be an object, got {}", other)),
                );
            }
        };

        if !self.tools.catalog().iter().any(|t| t.name == call.name) {
            tracing::warn!(tool = %call.name, "Call for unknown tool");
            return error_reply(id, &McpError::ToolNotFound(call.name));
        }

        tracing::debug!(tool = %call.name, "Executing tool");
        let result = match self.tools.invoke(&call.name, &arguments).await {
            Ok(result) => CallToolResult::from(result),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                CallToolResult::error(e.to_string())
            }
        };

        reply(id, result)
    }
}

fn reply<T: Serialize>(id: RpcId, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => error_reply(id, &McpError::JsonParse(e)),
    }
}

fn error_reply(id: RpcId, err: &McpError) -> JsonRpcResponse {
    let rpc = err.to_rpc_error();
    JsonRpcResponse::error(id, rpc.code, rpc.message)
}

fn reject(status: StatusCode, id: RpcId, err: &McpError) -> Response {
    (status, Json(error_reply(id, err))).into_response()
}

/// Session id from the request, or the rejection to send back
fn require_session(server: &McpServer, headers: &HeaderMap, id: &RpcId) -> Result<String, Response> {
    let Some(session_id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            id.clone(),
            &McpError::InvalidParams(format!("missing {} header", SESSION_HEADER)),
        ));
    };

    if !server.touch_session(session_id) {
        return Err(reject(
            StatusCode::NOT_FOUND,
            id.clone(),
            &McpError::SessionExpired(session_id.to_string()),
        ));
    }
    Ok(session_id.to_string())
}

async fn handle_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let unknown_id = RpcId::Number(0);

    let raw: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse JSON");
            return reject(StatusCode::BAD_REQUEST, unknown_id, &McpError::JsonParse(e));
        }
    };

    // Messages without an id are notifications
    if raw.get("id").is_none() {
        if let Err(rejection) = require_session(&server, &headers, &unknown_id) {
            return rejection;
        }
        if let Ok(notification) = serde_json::from_value::<JsonRpcNotification>(raw) {
            server.handle_notification(&notification);
        }
        return StatusCode::ACCEPTED.into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
            return reject(StatusCode::BAD_REQUEST, unknown_id, &McpError::JsonParse(e));
        }
    };

    if request.method == "initialize" {
        let session_id = server.open_session();
        let mut response = Json(server.initialize(request.id, &request.params)).into_response();
        if let Ok(value) = HeaderValue::from_str(&session_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(SESSION_HEADER), value);
        }
        return response;
    }

    if let Err(rejection) = require_session(&server, &headers, &request.id) {
        return rejection;
    }

    Json(server.handle_request(&request).await).into_response()
}

async fn handle_delete(State(server): State<Arc<McpServer>>, headers: HeaderMap) -> Response {
    let id = RpcId::Number(0);
    let session_id = match require_session(&server, &headers, &id) {
        Ok(session_id) => session_id,
        Err(rejection) => return rejection,
    };

    server.sessions().remove(&session_id);
    tracing::info!(session = %session_id, "MCP session terminated");
    StatusCode::OK.into_response()
}

/// Router serving the MCP endpoint at `/mcp`.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .with_state(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::error::{AgentError, Result as AgentResult};
    use agent_core::tool::{ParameterSchema, Tool, ToolRegistry, ToolResult, ToolSchema};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echo the input".into(),
                parameters: vec![ParameterSchema::required("text", "string", "Text to echo")],
            }
        }

        async fn execute(&self, arguments: &ToolArguments) -> AgentResult<ToolResult> {
            Ok(ToolResult::text(arguments["text"].as_str().unwrap_or_default()))
        }
    }

    struct Explode;

    #[async_trait]
    impl Tool for Explode {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "explode".into(),
                description: "Always fails".into(),
                parameters: Vec::new(),
            }
        }

        async fn execute(&self, _arguments: &ToolArguments) -> AgentResult<ToolResult> {
            Err(AgentError::ToolInvocation("kaboom".into()))
        }
    }

    fn server() -> Arc<McpServer> {
        let mut registry = ToolRegistry::new();
        registry.register(Echo).unwrap();
        registry.register(Explode).unwrap();
        Arc::new(McpServer::new(Arc::new(registry)).with_name("test-tools"))
    }

    async fn send(app: &Router, method: &str, session: Option<&str>, body: Value) -> (StatusCode, HeaderMap, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    async fn open(app: &Router) -> String {
        let (status, headers, body) = send(
            app,
            "POST",
            None,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test"}
            }}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["serverInfo"]["name"], "test-tools");
        headers[SESSION_HEADER].to_str().unwrap().to_string()
    }

    fn rpc(id: i64, method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let server = server();
        let app = router(server.clone());
        let session = open(&app).await;
        assert_eq!(server.session_count(), 1);

        let (status, _, _) = send(
            &app,
            "POST",
            Some(&session),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _, _) = send(&app, "DELETE", Some(&session), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(server.session_count(), 0);

        let (status, _, _) = send(&app, "POST", Some(&session), rpc(2, "ping", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo).unwrap();
        let server = Arc::new(
            McpServer::new(Arc::new(registry))
                .with_name("test-tools")
                .with_session_ttl(Duration::from_millis(300)),
        );
        let app = router(server.clone());

        let idle = open(&app).await;
        let active = open(&app).await;
        assert_eq!(server.session_count(), 2);

        // Traffic on `active` keeps it alive past the first deadline
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let (status, _, _) = send(&app, "POST", Some(&active), rpc(2, "ping", json!({}))).await;
            assert_eq!(status, StatusCode::OK);
        }

        assert_eq!(server.session_count(), 1);
        let (status, _, body) = send(&app, "POST", Some(&idle), rpc(3, "ping", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"]["message"].as_str().unwrap().contains(&idle));
    }

    #[tokio::test]
    async fn test_requests_require_session() {
        let app = router(server());
        let (status, _, body) = send(&app, "POST", None, rpc(2, "tools/list", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains(SESSION_HEADER));

        let (status, _, _) = send(&app, "POST", Some("not-a-session"), rpc(2, "tools/list", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let app = router(server());
        let session = open(&app).await;

        let (_, _, body) = send(&app, "POST", Some(&session), rpc(2, "tools/list", json!({}))).await;
        let names: Vec<&str> = body["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["echo", "explode"]);
        assert!(body["result"].get("nextCursor").is_none());

        let (_, _, body) = send(
            &app,
            "POST",
            Some(&session),
            rpc(3, "tools/call", json!({"name": "echo", "arguments": {"text": "hi"}})),
        )
        .await;
        assert_eq!(body["id"], 3);
        assert_eq!(body["result"], json!({"content": [{"type": "text", "text": "hi"}], "isError": false}));
    }

    #[tokio::test]
    async fn test_tool_failures() {
        let app = router(server());
        let session = open(&app).await;

        let (_, _, body) = send(&app, "POST", Some(&session), rpc(2, "tools/call", json!({"name": "explode"}))).await;
        assert_eq!(body["result"]["isError"], true);
        assert!(body["result"]["content"][0]["text"].as_str().unwrap().contains("kaboom"));

        let (_, _, body) = send(&app, "POST", Some(&session), rpc(3, "tools/call", json!({"name": "nope"}))).await;
        assert_eq!(body["error"]["code"], error_codes::INVALID_PARAMS);

        let (_, _, body) = send(
            &app,
            "POST",
            Some(&session),
            rpc(4, "tools/call", json!({"name": "echo", "arguments": [1, 2]})),
        )
        .await;
        assert_eq!(body["error"]["code"], error_codes::INVALID_PARAMS);

        let (_, _, body) = send(&app, "POST", Some(&session), rpc(5, "resources/list", json!({}))).await;
        assert_eq!(body["error"]["code"], error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_paged_listing() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo).unwrap();
        registry.register(Explode).unwrap();
        let app = router(Arc::new(McpServer::new(Arc::new(registry)).with_page_size(1)));
        let session = open(&app).await;

        let (_, _, first) = send(&app, "POST", Some(&session), rpc(2, "tools/list", json!({}))).await;
        assert_eq!(first["result"]["tools"].as_array().unwrap().len(), 1);
        assert_eq!(first["result"]["nextCursor"], "1");

        let (_, _, second) = send(&app, "POST", Some(&session), rpc(3, "tools/list", json!({"cursor": "1"}))).await;
        assert_eq!(second["result"]["tools"][0]["name"], "explode");
        assert!(second["result"].get("nextCursor").is_none());

        let (_, _, bad) = send(&app, "POST", Some(&session), rpc(4, "tools/list", json!({"cursor": "zz"}))).await;
        assert_eq!(bad["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = router(server());
        let response = app
            .oneshot(Request::builder().method("POST").uri("/mcp").body(Body::from("{not json")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
