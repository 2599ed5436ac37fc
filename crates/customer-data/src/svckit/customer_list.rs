//! Customer Listing Tool

use std::sync::Arc;

use agent_core::{Result as CoreResult, Tool, ToolArguments, ToolResult, ToolSchema};
use async_trait::async_trait;

use super::{LIST_ALL, directory_failure, response_format, response_format_param};
use crate::directory::CustomerDirectory;
use crate::format::render_customers;

/// List every customer
pub struct CustomerListTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl CustomerListTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CustomerListTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: LIST_ALL.into(),
            description: "Retrieve every customer currently in the database.".into(),
            parameters: vec![response_format_param()],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<ToolResult> {
        match self.directory.customers().await {
            Ok(customers) => Ok(ToolResult::text(render_customers(&customers, response_format(arguments))?)),
            Err(e) => Ok(directory_failure(LIST_ALL, &e)),
        }
    }
}
