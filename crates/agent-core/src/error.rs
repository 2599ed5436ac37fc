//! Error Types

use thiserror::Error;

use crate::reasoning::OrchestrationOutcome;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// No active connection to the tool-hosting service
    #[error("Tool service unavailable: {0}")]
    ToolUnavailable(String),

    /// Tool name not present in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool definition or arguments failed validation
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Remote or local tool call failed
    #[error("Tool invocation error: {0}")]
    ToolInvocation(String),

    /// The model emitted arguments that do not decode to a JSON object
    #[error("Malformed arguments for tool '{tool}' (call {call_id}): {reason}")]
    MalformedToolArguments {
        call_id: String,
        tool: String,
        reason: String,
    },

    /// Round budget exhausted while the model still requested tools
    #[error("No final answer after {max_rounds} rounds")]
    Incomplete {
        max_rounds: usize,
        partial: Box<OrchestrationOutcome>,
    },

    /// Run cancelled through its cancellation token
    #[error("Run cancelled")]
    Cancelled,

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Failures the loop turns into an error tool result instead of aborting.
    ///
    /// The model sees these on the next round and can correct itself.
    pub fn is_recoverable_tool_failure(&self) -> bool {
        matches!(
            self,
            AgentError::ToolInvocation(_)
                | AgentError::UnknownTool(_)
                | AgentError::ToolValidation(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            AgentError::ToolUnavailable(_) => "The tool service is not connected. Please try again.".into(),
            AgentError::UnknownTool(name) => format!("The tool '{}' is not available.", name),
            AgentError::ToolValidation(msg) => format!("Invalid tool input: {}", msg),
            AgentError::ToolInvocation(msg) => format!("Tool error: {}", msg),
            AgentError::MalformedToolArguments { tool, .. } => {
                format!("The AI produced unreadable arguments for '{}'.", tool)
            }
            AgentError::Incomplete { .. } => "The request needed too many steps. Please try a simpler query.".into(),
            AgentError::Cancelled => "The request was cancelled.".into(),
            AgentError::InvalidInput(msg) => msg.clone(),
            AgentError::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            AgentError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
