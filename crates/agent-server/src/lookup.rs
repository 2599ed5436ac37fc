//! Lookup Service
//!
//! One agent run per request. Each run opens its own MCP session, offers the
//! server's catalog to the model, and closes the session when it returns.

use std::sync::Arc;

use agent_core::{
    AgentBuilder, AgentError, CaptureRules, LlmProvider, OrchestrationOutcome, Result,
    reasoning::DEFAULT_MAX_ROUNDS,
};
use agent_mcp::{McpClientConfig, with_session};
use agent_runtime::{OpenAiConfig, OpenAiProvider};
use customer_data::{CustomerLookup, capture_rules, lookup_query};
use tokio_util::sync::CancellationToken;

pub struct LookupService {
    provider: Arc<dyn LlmProvider>,
    mcp: McpClientConfig,
    default_model: String,
    max_rounds: usize,
}

impl LookupService {
    pub fn new(provider: Arc<dyn LlmProvider>, mcp: McpClientConfig, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            mcp,
            default_model: default_model.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// OpenAI/Azure provider and MCP endpoint from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// `AGENT_MAX_ROUNDS` overrides the round budget.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = OpenAiProvider::new(OpenAiConfig::from_lookup(&lookup)?)?;
        let default_model = provider.default_model().to_string();
        let mcp = McpClientConfig::from_lookup(&lookup)?;

        let mut service = Self::new(Arc::new(provider), mcp, default_model);
        if let Some(raw) = lookup("AGENT_MAX_ROUNDS") {
            let max_rounds = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| AgentError::Config(format!("AGENT_MAX_ROUNDS must be a positive number: {}", raw)))?;
            service = service.with_max_rounds(max_rounds);
        }
        Ok(service)
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    pub fn mcp_server_url(&self) -> &str {
        &self.mcp.server_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Fetch a customer's record and purchases by email
    pub async fn customer_lookup(
        &self,
        email: &str,
        max_rounds: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<CustomerLookup> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AgentError::InvalidInput("email must not be empty".into()));
        }

        tracing::info!(%email, "Customer lookup");
        let outcome = self
            .run(&lookup_query(email), None, max_rounds, capture_rules(), cancel)
            .await?;
        tracing::info!(rounds = outcome.rounds, captured = outcome.captures.len(), "Lookup finished");
        Ok(outcome.into())
    }

    /// Free-form request against the tool server's catalog
    pub async fn chat(
        &self,
        message: &str,
        model: Option<&str>,
        max_rounds: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<OrchestrationOutcome> {
        self.run(message, model, max_rounds, CaptureRules::new(), cancel).await
    }

    async fn run(
        &self,
        query: &str,
        model: Option<&str>,
        max_rounds: Option<usize>,
        captures: CaptureRules,
        cancel: &CancellationToken,
    ) -> Result<OrchestrationOutcome> {
        if max_rounds == Some(0) {
            return Err(AgentError::InvalidInput("max_rounds must be at least 1".into()));
        }
        let model = model.filter(|m| !m.trim().is_empty()).unwrap_or(&self.default_model);
        let max_rounds = max_rounds.unwrap_or(self.max_rounds);

        with_session(self.mcp.clone(), |client| async move {
            let agent = AgentBuilder::new()
                .provider(self.provider.clone())
                .tools(Arc::new(client))
                .model(model)
                .max_rounds(max_rounds)
                .captures(captures)
                .build()?;
            agent.run_with_cancel(query, cancel).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, call, spawn_tool_server, unbound_url};
    use agent_core::Message;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_lookup_end_to_end() {
        let (url, server) = spawn_tool_server().await;
        let provider = ScriptedProvider::new(vec![
            call("c1", "customer_get_by_email", r#"{"email":"Jane.Smith@example.com"}"#),
            call("c2", "customer_get_products", r#"{"customer_id":2}"#),
            Message::assistant("Jane Smith (id 2) bought an iPhone 15 Pro and a cable."),
        ]);
        let service = LookupService::new(provider.clone(), McpClientConfig::new(url), "test-model");

        let lookup = service
            .customer_lookup("jane.smith@example.com", None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(lookup.assistant_answer.unwrap().contains("iPhone"));
        assert!(lookup.user_record.unwrap().text_content().contains("**Name:** Jane Smith"));
        assert!(lookup.products.unwrap().text_content().contains("PHO001"));

        let first = provider.first_request();
        assert!(first.0[0].content.as_deref().unwrap().starts_with("I need customer and product details for jane.smith@example.com"));
        assert_eq!(first.1.len(), 3);
        assert_eq!(provider.models(), ["test-model"; 3]);

        // Session closed after the run
        assert_eq!(server.session_count(), 0);
    }

    #[tokio::test]
    async fn test_round_budget() {
        let (url, _server) = spawn_tool_server().await;
        let provider = ScriptedProvider::new(vec![call(
            "c1",
            "customer_get_by_email",
            r#"{"email":"bob.wilson@example.com"}"#,
        )]);
        let service = LookupService::new(provider, McpClientConfig::new(url), "m");

        let err = service
            .customer_lookup("bob.wilson@example.com", Some(1), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            AgentError::Incomplete { max_rounds, partial } => {
                assert_eq!(max_rounds, 1);
                assert!(partial.capture(customer_data::USER_RECORD_SLOT).is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_tool_server_down() {
        let provider = ScriptedProvider::new(vec![Message::assistant("unused")]);
        let service = LookupService::new(provider.clone(), McpClientConfig::new(unbound_url()), "m");

        let err = service
            .chat("hello", None, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolUnavailable(_)));
        assert!(provider.models().is_empty());
    }

    #[tokio::test]
    async fn test_blank_email() {
        let provider = ScriptedProvider::new(vec![]);
        let service = LookupService::new(provider, McpClientConfig::new(unbound_url()), "m");
        let err = service
            .customer_lookup("   ", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_chat_model_override() {
        let (url, _server) = spawn_tool_server().await;
        let provider = ScriptedProvider::new(vec![Message::assistant("There are 3 customers.")]);
        let service = LookupService::new(provider.clone(), McpClientConfig::new(url), "default-model");

        let outcome = service
            .chat("How many customers?", Some("gpt-4o"), None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.assistant_answer.as_deref(), Some("There are 3 customers."));
        assert_eq!(provider.models(), ["gpt-4o"]);
    }

    #[tokio::test]
    async fn test_zero_rounds_rejected_before_connecting() {
        let provider = ScriptedProvider::new(vec![Message::assistant("unused")]);
        let service = LookupService::new(provider.clone(), McpClientConfig::new(unbound_url()), "m");

        let err = service
            .chat("hello", None, Some(0), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert!(provider.models().is_empty());
    }

    #[test]
    fn test_from_lookup() {
        let env = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("MCP_SERVER_URL", "http://tools:3000/mcp"),
            ("AGENT_MAX_ROUNDS", " 8 "),
        ]);
        let service = LookupService::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(service.default_model(), "gpt-4o");
        assert_eq!(service.mcp_server_url(), "http://tools:3000/mcp");
        assert_eq!(service.max_rounds, 8);

        let defaults = LookupService::from_lookup(|k| (k == "OPENAI_API_KEY").then(|| "sk".to_string())).unwrap();
        assert_eq!(defaults.max_rounds, DEFAULT_MAX_ROUNDS);

        for bad in ["many", "0"] {
            let result = LookupService::from_lookup(|k| match k {
                "OPENAI_API_KEY" => Some("sk".to_string()),
                "AGENT_MAX_ROUNDS" => Some(bad.to_string()),
                _ => None,
            });
            assert!(matches!(result, Err(AgentError::Config(_))));
        }
    }
}
