//! JSON-RPC 2.0 and MCP protocol types.
//!
//! Wire format for the Model Context Protocol over streamable HTTP: every
//! client message is a POST of one JSON-RPC message, and the session is
//! carried in the [`SESSION_HEADER`] header.

use agent_core::tool::{ContentItem, ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The MCP protocol version this crate speaks.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Header carrying the server-issued session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

// ── JSON-RPC 2.0 Base Types ─────────────────────────────────────────

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 response message (success or error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC request ID. Can be a number or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
}

impl RpcId {
    /// Whether a raw JSON id refers to this id
    pub fn matches(&self, raw: &Value) -> bool {
        match (self, raw) {
            (RpcId::Number(n), Value::Number(v)) => v.as_i64() == Some(*n),
            (RpcId::String(s), Value::String(v)) => s == v,
            _ => false,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

// ── MCP Initialize ──────────────────────────────────────────────────

/// Parameters for the `initialize` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

/// Client capabilities advertised during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
}

/// Information about the connecting client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result returned from `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Server capabilities advertised during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

/// Information about the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ── MCP tools/list ──────────────────────────────────────────────────

/// Parameters for `tools/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Result of `tools/list`; `next_cursor` is set while more pages remain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<ToolInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Describes a single tool in MCP format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object"})
}

impl From<ToolDefinition> for ToolInfo {
    fn from(def: ToolDefinition) -> Self {
        Self {
            name: def.name,
            description: def.description,
            input_schema: def.input_schema,
        }
    }
}

impl From<ToolInfo> for ToolDefinition {
    fn from(info: ToolInfo) -> Self {
        ToolDefinition::new(info.name, info.description, info.input_schema)
    }
}

// ── MCP tools/call ──────────────────────────────────────────────────

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

/// Content block within a tool call result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
}

const OCTET_STREAM: &str = "application/octet-stream";

impl From<ContentItem> for ToolContent {
    fn from(item: ContentItem) -> Self {
        match item {
            ContentItem::Text { text } => ToolContent::Text { text },
            ContentItem::Unknown { repr } => ToolContent::Text { text: repr },
            ContentItem::Binary {
                kind,
                data,
                mime_type,
            } => {
                let mime_type = mime_type.unwrap_or_else(|| OCTET_STREAM.to_string());
                match kind.as_str() {
                    "audio" => ToolContent::Audio { data, mime_type },
                    "image" => ToolContent::Image { data, mime_type },
                    _ => ToolContent::Resource {
                        resource: json!({"uri": format!("blob:{}", kind), "blob": data, "mimeType": mime_type}),
                    },
                }
            }
        }
    }
}

impl From<ToolResult> for CallToolResult {
    fn from(result: ToolResult) -> Self {
        Self {
            content: result.content.into_iter().map(ToolContent::from).collect(),
            is_error: result.is_error,
        }
    }
}

impl CallToolResult {
    /// Single-text error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: RpcId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: RpcId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: RpcId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC 2.0 notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::extract;

    #[test]
    fn test_rpc_id_matching() {
        assert!(RpcId::Number(7).matches(&json!(7)));
        assert!(!RpcId::Number(7).matches(&json!("7")));
        assert!(RpcId::String("a".into()).matches(&json!("a")));
        assert_eq!(serde_json::to_string(&RpcId::Number(42)).unwrap(), "42");
    }

    #[test]
    fn test_list_tools_result_cursor() {
        let parsed: ListToolsResult = serde_json::from_value(json!({
            "tools": [{"name": "customer_list_all", "inputSchema": {"type": "object"}}],
            "nextCursor": "1"
        }))
        .unwrap();
        assert_eq!(parsed.next_cursor.as_deref(), Some("1"));
        assert_eq!(parsed.tools[0].description, "");

        let last = serde_json::to_value(ListToolsResult {
            tools: Vec::new(),
            next_cursor: None,
        })
        .unwrap();
        assert!(last.get("nextCursor").is_none());
    }

    #[test]
    fn test_tool_info_conversions() {
        let def = ToolDefinition::new("echo", "Echo tool", json!({"type": "object"}));
        let info: ToolInfo = def.clone().into();
        assert_eq!(serde_json::to_value(&info).unwrap()["inputSchema"], json!({"type": "object"}));
        let back: ToolDefinition = info.into();
        assert_eq!(back, def);
    }

    #[test]
    fn test_call_tool_result_survives_extraction() {
        let result = ToolResult::text("### Customer")
            .with_content(ContentItem::Binary {
                kind: "image".into(),
                data: "iVBOR".into(),
                mime_type: Some("image/png".into()),
            });
        let wire = serde_json::to_value(CallToolResult::from(result.clone())).unwrap();

        assert_eq!(wire["content"][1]["type"], "image");
        assert_eq!(wire["isError"], false);
        assert_eq!(extract(&wire), result);
    }

    #[test]
    fn test_error_result_wire_shape() {
        let wire = serde_json::to_value(CallToolResult::error("boom")).unwrap();
        assert_eq!(wire, json!({"content": [{"type": "text", "text": "boom"}], "isError": true}));
    }
}
