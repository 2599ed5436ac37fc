//! Error types for the MCP crate.

use agent_core::AgentError;

use crate::types::{JsonRpcError, error_codes};

pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur during MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Failed to parse JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// HTTP transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success HTTP status.
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// No response carrying the request's id was found.
    #[error("No response for request {0}")]
    MissingResponse(String),

    /// The requested method is not supported.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters for a method.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The requested tool is not in the catalog.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The handshake did not finish in time.
    #[error("Timed out during {0}")]
    Timeout(String),

    /// No open session.
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// The server no longer recognizes the session.
    #[error("Session expired: {0}")]
    SessionExpired(String),
}

impl McpError {
    /// Convert to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            McpError::JsonParse(_) => error_codes::PARSE_ERROR,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::ToolNotFound(_) => error_codes::INVALID_PARAMS,
            McpError::Rpc { code, .. } => *code,
            _ => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: None,
        }
    }
}

impl From<McpError> for AgentError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::NotConnected(_) | McpError::SessionExpired(_) | McpError::Timeout(_) => {
                AgentError::ToolUnavailable(err.to_string())
            }
            McpError::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                AgentError::ToolUnavailable(err.to_string())
            }
            McpError::ToolNotFound(name) => AgentError::UnknownTool(name),
            other => AgentError::ToolInvocation(other.to_string()),
        }
    }
}

impl McpError {
    /// Map a failed `tools/call` on an open session.
    ///
    /// Only a lost session makes the tool service unavailable; a timeout or
    /// transport failure on one call is a failed invocation the model can see.
    pub fn into_call_failure(self) -> AgentError {
        match self {
            McpError::NotConnected(_) | McpError::SessionExpired(_) => {
                AgentError::ToolUnavailable(self.to_string())
            }
            McpError::ToolNotFound(name) => AgentError::UnknownTool(name),
            other => AgentError::ToolInvocation(other.to_string()),
        }
    }
}
