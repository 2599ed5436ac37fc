//! Customer Lookup Agent HTTP Server
//!
//! Axum server exposing the tool-calling agent over REST. Tools are served
//! by a separate MCP server (`customer-mcp`).

use agent_server::{AppState, LookupService, app, env_or, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    init_tracing();

    let service = LookupService::from_env()?;

    match service.provider().health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", service.provider().name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not reachable - requests will fail", service.provider().name());
            tracing::warn!("  Check AZURE_OPENAI_ENDPOINT / OPENAI_API_KEY in .env");
        }
    }
    tracing::info!("Tool server: {}", service.mcp_server_url());

    let state = AppState::new(service);
    let shutdown = state.shutdown.clone();
    let app = app(state);

    // Start server
    let addr = env_or("BIND_ADDR", "0.0.0.0:8080");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 agent server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  POST /api/chat             - Free-form agent request");
    tracing::info!("  POST /api/customer-lookup  - Customer record and purchases by email");
    tracing::info!("");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
