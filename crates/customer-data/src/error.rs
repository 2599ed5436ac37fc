//! Error Types for the Customer Directory

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input; carries the server's detail when it gave one
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Rate limited by customer API")]
    RateLimited,

    #[error("Customer API returned status {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Cannot connect to {0}")]
    Connect(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DataError {
    /// Short, actionable text handed back to the model as a tool result
    pub fn user_message(&self) -> String {
        match self {
            DataError::NotFound(_) => "Error: Resource not found. Double-check the ID or email.".into(),
            DataError::Validation(detail) if detail.trim().is_empty() => {
                "Error: Validation failed. Check your input parameters.".into()
            }
            DataError::Validation(detail) => format!("Error: Validation failed - {}", detail),
            DataError::RateLimited => "Error: Rate limit hit. Please wait and retry.".into(),
            DataError::Status(status) => format!("Error: API returned status {}.", status),
            DataError::Timeout => "Error: Request timed out. Try again shortly.".into(),
            DataError::Connect(url) => {
                format!("Error: Cannot connect to Customer API at {}. Is it running?", url)
            }
            DataError::Config(msg) => format!("Error: Config - {}", msg),
            DataError::Network(e) => format!("Error: Network - {}", e),
            DataError::Serialization(e) => format!("Error: Serialization - {}", e),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }
}

impl From<DataError> for agent_core::AgentError {
    fn from(err: DataError) -> Self {
        agent_core::AgentError::ToolInvocation(err.to_string())
    }
}
