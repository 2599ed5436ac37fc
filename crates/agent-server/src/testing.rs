//! Test fixtures: a scripted model and an in-process tool server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use agent_core::{
    AgentError, Completion, GenerationOptions, LlmProvider, Message, Result, ToolCallRequest,
    ToolDefinition,
};
use agent_mcp::McpServer;
use async_trait::async_trait;
use customer_data::{MockCustomerStore, SERVER_INSTRUCTIONS, tool_registry};

type Request = (Vec<Message>, Vec<ToolDefinition>, String);

pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Message>>,
    seen: Mutex<Vec<Request>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::default(),
        })
    }

    pub fn first_request(&self) -> (Vec<Message>, Vec<ToolDefinition>) {
        let seen = self.seen.lock().unwrap();
        (seen[0].0.clone(), seen[0].1.clone())
    }

    pub fn models(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|r| r.2.clone()).collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.seen
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec(), options.model.clone()));
        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
        Ok(Completion {
            message,
            model: options.model.clone(),
            usage: None,
            finish_reason: None,
        })
    }
}

/// Assistant turn requesting one tool call
pub fn call(id: &str, name: &str, arguments: &str) -> Message {
    Message::assistant_with_tool_calls(None, vec![ToolCallRequest::new(id, name, arguments)])
}

/// Serve the customer tools over MCP on an ephemeral port
pub async fn spawn_tool_server() -> (String, Arc<McpServer>) {
    let registry = tool_registry(Arc::new(MockCustomerStore::seeded())).unwrap();
    let server = Arc::new(
        McpServer::new(Arc::new(registry))
            .with_name("customer_mcp")
            .with_instructions(SERVER_INSTRUCTIONS),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = agent_mcp::router(server.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/mcp", addr), server)
}

/// URL with nothing listening behind it
pub fn unbound_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/mcp", addr)
}
