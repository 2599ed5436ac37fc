//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use agent_core::AgentError;
use customer_data::CustomerLookup;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub mcp_server: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub model: String,
    pub rounds: usize,
}

#[derive(Debug, Deserialize)]
pub struct CustomerLookupRequest {
    pub email: String,
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.service.provider();
    let provider_connected = provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: provider.name().to_string(),
        provider_connected,
        mcp_server: state.service.mcp_server_url().to_string(),
    })
}

/// Free-form agent request
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> HandlerResult<ChatResponse> {
    let model = payload
        .model
        .clone()
        .unwrap_or_else(|| state.service.default_model().to_string());

    let cancel = state.shutdown.child_token();
    let outcome = state
        .service
        .chat(&payload.message, Some(&model), payload.max_rounds, &cancel)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatResponse {
        message: outcome.assistant_answer.unwrap_or_default(),
        model,
        rounds: outcome.rounds,
    }))
}

/// Customer record and purchases by email
pub async fn customer_lookup_handler(
    State(state): State<AppState>,
    Json(payload): Json<CustomerLookupRequest>,
) -> HandlerResult<CustomerLookup> {
    let cancel = state.shutdown.child_token();
    state
        .service
        .customer_lookup(&payload.email, payload.max_rounds, &cancel)
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(err: AgentError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        AgentError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        AgentError::Incomplete { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPLETE"),
        AgentError::ToolUnavailable(_) => (StatusCode::BAD_GATEWAY, "TOOL_SERVICE_UNAVAILABLE"),
        AgentError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    if status.is_server_error() {
        tracing::error!("Agent error: {}", err);
    } else {
        tracing::warn!("Agent request rejected: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}
