//! Customer Lookup Tool

use std::sync::Arc;

use agent_core::{
    AgentError, Result as CoreResult, Tool, ToolArguments, ToolResult, ToolSchema,
    tool::ParameterSchema,
};
use async_trait::async_trait;
use serde_json::Value;

use super::{GET_BY_EMAIL, directory_failure, response_format, response_format_param};
use crate::directory::CustomerDirectory;
use crate::format::render_customer;
use crate::model::normalize_email;

/// Look up one customer by email
pub struct CustomerByEmailTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl CustomerByEmailTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CustomerByEmailTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: GET_BY_EMAIL.into(),
            description: "Look up a single customer by their email address. Returns the customer's \
                          id, name, email and date of birth. Use response_format='json' for \
                          machine-readable output."
                .into(),
            parameters: vec![
                ParameterSchema::required(
                    "email",
                    "string",
                    "Customer email address (e.g. jane@example.com)",
                ),
                response_format_param(),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<ToolResult> {
        let email = arguments
            .get("email")
            .and_then(Value::as_str)
            .map(normalize_email)
            .ok_or_else(|| AgentError::ToolValidation("email must be a string".into()))?;

        tracing::info!(%email, "Looking up customer");
        match self.directory.customer_by_email(&email).await {
            Ok(customer) => Ok(ToolResult::text(render_customer(&customer, response_format(arguments))?)),
            Err(e) => Ok(directory_failure(GET_BY_EMAIL, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MockCustomerStore;
    use serde_json::json;

    fn tool() -> CustomerByEmailTool {
        CustomerByEmailTool::new(Arc::new(MockCustomerStore::seeded()))
    }

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_lookup_markdown() {
        let result = tool().execute(&args(json!({"email": " JOHN.DOE@example.com "}))).await.unwrap();
        assert!(!result.is_error);
        assert!(result.text_content().starts_with("### Customer\n- **ID:** 1\n  **Name:** John Doe"));
    }

    #[tokio::test]
    async fn test_lookup_json() {
        let result = tool()
            .execute(&args(json!({"email": "jane.smith@example.com", "response_format": "json"})))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(value["id"], 2);
    }

    #[tokio::test]
    async fn test_not_found_is_error_result() {
        let result = tool().execute(&args(json!({"email": "ghost@example.com"}))).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Error: Resource not found. Double-check the ID or email.");
    }

    #[tokio::test]
    async fn test_non_string_email() {
        let err = tool().execute(&args(json!({"email": 5}))).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
