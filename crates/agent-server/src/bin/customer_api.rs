//! Customer REST API over the seeded in-memory store.

use std::sync::Arc;

use agent_server::{env_or, init_tracing};
use customer_data::{MockCustomerStore, api};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let app = api::router(Arc::new(MockCustomerStore::seeded())).layer(TraceLayer::new_for_http());

    let addr = env_or("CUSTOMER_API_BIND", "0.0.0.0:8000");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Customer API running on http://{}", addr);
    tracing::info!("  GET /customer?email=<email>");
    tracing::info!("  GET /customers");
    tracing::info!("  GET /customer/{{customer_id}}/products");

    axum::serve(listener, app).await?;
    Ok(())
}
