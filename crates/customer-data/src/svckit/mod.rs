//! Service Kit - Agent Tools
//!
//! Customer-directory tools that implement `agent_core::Tool`. Directory
//! failures come back as error results carrying a short message the model
//! can act on; only malformed arguments fail the call itself.

mod customer_by_email;
mod customer_list;
mod customer_products;

pub use customer_by_email::CustomerByEmailTool;
pub use customer_list::CustomerListTool;
pub use customer_products::CustomerProductsTool;

use agent_core::{ToolArguments, ToolResult, tool::ParameterSchema};
use serde_json::{Value, json};

use crate::error::DataError;
use crate::format::ResponseFormat;

pub const GET_BY_EMAIL: &str = "customer_get_by_email";
pub const LIST_ALL: &str = "customer_list_all";
pub const GET_PRODUCTS: &str = "customer_get_products";

fn response_format_param() -> ParameterSchema {
    ParameterSchema::optional(
        "response_format",
        "string",
        "'markdown' (default, human-readable) or 'json'",
        json!("markdown"),
    )
    .with_enum(vec![json!("markdown"), json!("json")])
}

fn response_format(arguments: &ToolArguments) -> ResponseFormat {
    ResponseFormat::parse(arguments.get("response_format").and_then(Value::as_str))
}

fn directory_failure(tool: &str, err: &DataError) -> ToolResult {
    tracing::warn!(tool, error = %err, "Customer directory call failed");
    ToolResult::error(err.user_message())
}
