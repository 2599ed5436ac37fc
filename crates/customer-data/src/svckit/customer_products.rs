//! Customer Purchases Tool

use std::sync::Arc;

use agent_core::{
    AgentError, Result as CoreResult, Tool, ToolArguments, ToolResult, ToolSchema,
    tool::ParameterSchema,
};
use async_trait::async_trait;
use serde_json::Value;

use super::{GET_PRODUCTS, directory_failure, response_format, response_format_param};
use crate::directory::CustomerDirectory;
use crate::format::render_products;

/// Products bought by one customer, by numeric id
pub struct CustomerProductsTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl CustomerProductsTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

/// Accepts integers and integral strings; models send both.
fn customer_id(arguments: &ToolArguments) -> CoreResult<i64> {
    let parsed = match arguments.get("customer_id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AgentError::ToolValidation("customer_id must be an integer".into()))
}

#[async_trait]
impl Tool for CustomerProductsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: GET_PRODUCTS.into(),
            description: "Get all products purchased by a customer. IMPORTANT: This tool requires \
                          a numeric customer_id, NOT an email. If you only have an email address, \
                          call customer_get_by_email first to look up the customer and retrieve \
                          their numeric 'id' field, then pass that id here."
                .into(),
            parameters: vec![
                ParameterSchema::required(
                    "customer_id",
                    "integer",
                    "Numeric customer ID (e.g. 42). Call customer_get_by_email first if you only have an email.",
                ),
                response_format_param(),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<ToolResult> {
        let customer_id = customer_id(arguments)?;
        if customer_id < 1 {
            return Ok(ToolResult::error("Error: customer_id must be a positive integer (>= 1)."));
        }

        tracing::info!(customer_id, "Fetching customer products");
        match self.directory.products_for(customer_id).await {
            Ok(products) => Ok(ToolResult::text(render_products(
                customer_id,
                &products,
                response_format(arguments),
            )?)),
            Err(e) => Ok(directory_failure(GET_PRODUCTS, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MockCustomerStore;
    use serde_json::json;

    fn tool() -> CustomerProductsTool {
        CustomerProductsTool::new(Arc::new(MockCustomerStore::seeded()))
    }

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_products_markdown() {
        let result = tool().execute(&args(json!({"customer_id": 2}))).await.unwrap();
        let text = result.text_content();
        assert!(text.starts_with("### Products for Customer 2 (total: 2)\n\n- **Code:** PHO001"));
        assert!(text.contains("**Warranty Expires:** 2026-06-05"));
    }

    #[tokio::test]
    async fn test_string_id_accepted() {
        let result = tool()
            .execute(&args(json!({"customer_id": "1", "response_format": "json"})))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_non_positive_id() {
        let result = tool().execute(&args(json!({"customer_id": 0}))).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Error: customer_id must be a positive integer (>= 1).");
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let result = tool().execute(&args(json!({"customer_id": 77}))).await.unwrap();
        assert!(result.is_error);
        assert!(result.text_content().contains("Resource not found"));
    }

    #[tokio::test]
    async fn test_email_instead_of_id() {
        let err = tool()
            .execute(&args(json!({"customer_id": "john.doe@example.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
