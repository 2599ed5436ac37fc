//! MCP tool server exposing the customer directory tools at `/mcp`.
//!
//! Backed by the customer REST API (`CUSTOMER_API_URL`), or by the in-memory
//! store when `CUSTOMER_DIRECTORY=mock`.

use std::sync::Arc;

use agent_core::ToolInvoker;
use agent_mcp::McpServer;
use agent_server::{env_or, init_tracing};
use customer_data::{CustomerApiClient, CustomerDirectory, MockCustomerStore, SERVER_INSTRUCTIONS, tool_registry};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let directory: Arc<dyn CustomerDirectory> = if env_or("CUSTOMER_DIRECTORY", "api") == "mock" {
        Arc::new(MockCustomerStore::seeded())
    } else {
        let client = CustomerApiClient::from_env()?;
        tracing::info!("Customer API: {}", client.base_url());
        Arc::new(client)
    };
    tracing::info!("Directory backend: {}", directory.name());

    let registry = tool_registry(directory)?;
    for tool in registry.catalog() {
        tracing::info!("  • {}", tool.name);
    }

    let server = McpServer::new(Arc::new(registry))
        .with_name("customer_mcp")
        .with_instructions(SERVER_INSTRUCTIONS);
    let app = agent_mcp::router(Arc::new(server)).layer(TraceLayer::new_for_http());

    let addr = env_or("MCP_BIND", "127.0.0.1:3000");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 customer_mcp serving http://{}/mcp", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
