//! # customer-data
//!
//! Customer directory for the lookup agent: domain model, REST API, a REST
//! client, and the agent tools that expose the directory to a model.
//!
//! ```text
//! ┌───────────┐  tools  ┌───────────────────┐  HTTP  ┌──────────────┐
//! │   Agent   │────────▶│ CustomerDirectory │───────▶│ Customer API │
//! │ (via MCP) │         │  (client / mock)  │        │    (axum)    │
//! └───────────┘         └───────────────────┘        └──────────────┘
//! ```

pub mod directory;
pub mod error;
pub mod format;
pub mod model;
pub mod svckit;

#[cfg(feature = "axum-handlers")]
pub mod api;

pub use directory::{CustomerApiClient, CustomerApiConfig, CustomerDirectory, MockCustomerStore};
pub use error::{DataError, Result};
pub use format::ResponseFormat;
pub use model::{Customer, Product};

use std::sync::Arc;

use agent_core::{CaptureRules, OrchestrationOutcome, ToolRegistry, ToolResult};
use serde::Serialize;

use crate::svckit::{CustomerByEmailTool, CustomerListTool, CustomerProductsTool, GET_BY_EMAIL, GET_PRODUCTS};

/// Capture slot for the customer lookup result
pub const USER_RECORD_SLOT: &str = "user_record";

/// Capture slot for the purchases result
pub const PRODUCTS_SLOT: &str = "products";

/// Instructions the tool server hands to clients at initialization
pub const SERVER_INSTRUCTIONS: &str = "Customer directory tools. Look customers up by email with \
    customer_get_by_email, then pass the numeric id to customer_get_products.";

/// Natural-language request for a customer's record and purchases
pub fn lookup_query(email: &str) -> String {
    format!(
        "I need customer and product details for {}. Fetch following details - customer name, id, date of birth, email and products",
        email.trim()
    )
}

/// Which tool results a lookup run keeps
pub fn capture_rules() -> CaptureRules {
    CaptureRules::new()
        .capture(GET_BY_EMAIL, USER_RECORD_SLOT)
        .capture(GET_PRODUCTS, PRODUCTS_SLOT)
}

/// Register the three directory tools
pub fn register_tools(registry: &mut ToolRegistry, directory: Arc<dyn CustomerDirectory>) -> agent_core::Result<()> {
    registry.register(CustomerByEmailTool::new(directory.clone()))?;
    registry.register(CustomerListTool::new(directory.clone()))?;
    registry.register(CustomerProductsTool::new(directory))?;
    Ok(())
}

/// Registry holding only the directory tools
pub fn tool_registry(directory: Arc<dyn CustomerDirectory>) -> agent_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_tools(&mut registry, directory)?;
    Ok(registry)
}

/// Result of a customer lookup run
#[derive(Clone, Debug, Default, Serialize)]
pub struct CustomerLookup {
    pub assistant_answer: Option<String>,
    pub user_record: Option<ToolResult>,
    pub products: Option<ToolResult>,
}

impl From<OrchestrationOutcome> for CustomerLookup {
    fn from(mut outcome: OrchestrationOutcome) -> Self {
        Self {
            user_record: outcome.captures.remove(USER_RECORD_SLOT),
            products: outcome.captures.remove(PRODUCTS_SLOT),
            assistant_answer: outcome.assistant_answer,
        }
    }
}
