//! Orchestration Loop
//!
//! Bounded tool-calling loop. Each round the model sees the whole transcript
//! and the tool catalog; it either answers in text (the run ends) or requests
//! tool calls, whose results are appended before the next round.
//!
//! ```text
//!   user query ──▶ [model] ──text──▶ final answer
//!                    ▲  │
//!                    │  └─tool calls──▶ [invoker] ──▶ [extract] ──┐
//!                    └──────────── tool messages ◀────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolCallRequest, ToolInvoker, ToolResult};

/// Default round budget
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Maps tool names to the capture slot their results are recorded in
#[derive(Clone, Debug, Default)]
pub struct CaptureRules {
    slots: BTreeMap<String, String>,
}

impl CaptureRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record results of `tool` into `slot`
    pub fn capture(mut self, tool: impl Into<String>, slot: impl Into<String>) -> Self {
        self.slots.insert(tool.into(), slot.into());
        self
    }

    pub fn slot_for(&self, tool: &str) -> Option<&str> {
        self.slots.get(tool).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of one run
#[derive(Clone, Debug, Serialize)]
pub struct OrchestrationOutcome {
    /// Final assistant text; `None` when the run did not reach an answer
    pub assistant_answer: Option<String>,

    /// Capture slot -> last result of the matching tool
    pub captures: BTreeMap<String, ToolResult>,

    /// Model queries performed
    pub rounds: usize,

    /// Full transcript of the run
    pub transcript: Conversation,
}

impl OrchestrationOutcome {
    pub fn capture(&self, slot: &str) -> Option<&ToolResult> {
        self.captures.get(slot)
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Optional system prompt placed before the user query
    pub system_prompt: Option<String>,

    /// Maximum model queries per run
    pub max_rounds: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Tool name -> capture slot
    pub captures: CaptureRules,

    /// Run the calls of one round concurrently
    pub parallel_tool_calls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
            generation: GenerationOptions::default(),
            captures: CaptureRules::default(),
            parallel_tool_calls: false,
        }
    }
}

/// Per-run state; dropped when `run` returns
struct RunState {
    conversation: Conversation,
    captures: BTreeMap<String, ToolResult>,
    rounds: usize,
}

impl RunState {
    fn new(system_prompt: Option<&str>, query: &str) -> Self {
        let mut conversation = match system_prompt {
            Some(prompt) => Conversation::with_system_prompt(prompt),
            None => Conversation::new(),
        };
        conversation.push(Message::user(query));

        Self {
            conversation,
            captures: BTreeMap::new(),
            rounds: 0,
        }
    }

    fn finish(self, assistant_answer: Option<String>) -> OrchestrationOutcome {
        OrchestrationOutcome {
            assistant_answer,
            captures: self.captures,
            rounds: self.rounds,
            transcript: self.conversation,
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolInvoker>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolInvoker>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<dyn ToolInvoker>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Answer a query, calling tools as the model requests
    pub async fn run(&self, query: &str) -> Result<OrchestrationOutcome> {
        self.run_with_cancel(query, &CancellationToken::new()).await
    }

    /// Like [`Agent::run`], aborting with [`AgentError::Cancelled`] once `cancel` fires
    pub async fn run_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<OrchestrationOutcome> {
        if query.trim().is_empty() {
            return Err(AgentError::InvalidInput("query must not be empty".into()));
        }

        let catalog = self.tools.catalog();
        let max_rounds = self.config.max_rounds.max(1);
        let mut run = RunState::new(self.config.system_prompt.as_deref(), query);

        while run.rounds < max_rounds {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            run.rounds += 1;

            tracing::debug!(
                round = run.rounds,
                messages = run.conversation.len(),
                provider = self.provider.name(),
                "Querying model"
            );

            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                result = self.provider.complete(
                    run.conversation.messages(),
                    &catalog,
                    &self.config.generation,
                ) => result?,
            };

            let mut message = completion.message;
            message.role = Role::Assistant;
            let requests = message.tool_calls.clone();
            let answer = message.content.clone();
            run.conversation.push(message);

            if requests.is_empty() {
                tracing::info!(rounds = run.rounds, "Model produced a final answer");
                return Ok(run.finish(answer));
            }

            let calls = requests
                .iter()
                .map(ToolCallRequest::decode)
                .collect::<Result<Vec<_>>>()?;

            let results = self.dispatch_all(&calls, cancel).await?;

            for (call, result) in calls.iter().zip(results) {
                if let Some(slot) = self.config.captures.slot_for(&call.name) {
                    run.captures.insert(slot.to_string(), result.clone());
                }
                run.conversation.push(Message::tool(&call.id, result.to_json()?));
            }
        }

        tracing::warn!(max_rounds, "Round budget exhausted without a final answer");
        Err(AgentError::Incomplete {
            max_rounds,
            partial: Box::new(run.finish(None)),
        })
    }

    /// Results come back in the order of `calls` in both modes
    async fn dispatch_all(
        &self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolResult>> {
        if self.config.parallel_tool_calls && calls.len() > 1 {
            return join_all(calls.iter().map(|call| self.dispatch(call, cancel)))
                .await
                .into_iter()
                .collect();
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch(call, cancel).await?);
        }
        Ok(results)
    }

    /// Invoke one tool; recoverable failures become error results
    async fn dispatch(&self, call: &ToolCall, cancel: &CancellationToken) -> Result<ToolResult> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        tracing::debug!(tool = %call.name, call_id = %call.id, "Executing tool");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            result = self.tools.invoke(&call.name, &call.arguments) => result,
        };

        match outcome {
            Ok(result) => {
                if result.is_error {
                    tracing::warn!(tool = %call.name, "Tool reported an error");
                }
                Ok(result)
            }
            Err(e) if e.is_recoverable_tool_failure() => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                Ok(ToolResult::error(format!("Error: {}", e)))
            }
            Err(e) => Err(e),
        }
    }

    /// Get the tool invoker
    pub fn tools(&self) -> &dyn ToolInvoker {
        self.tools.as_ref()
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<dyn ToolInvoker>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: Arc<dyn ToolInvoker>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = Some(temp);
        self
    }

    pub fn max_rounds(mut self, max: usize) -> Self {
        self.config.max_rounds = max;
        self
    }

    pub fn capture(mut self, tool: impl Into<String>, slot: impl Into<String>) -> Self {
        self.config.captures = self.config.captures.capture(tool, slot);
        self
    }

    pub fn captures(mut self, rules: CaptureRules) -> Self {
        self.config.captures = rules;
        self
    }

    pub fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.config.parallel_tool_calls = enabled;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self
            .tools
            .ok_or_else(|| AgentError::Config("Tool invoker is required".into()))?;
        if self.config.max_rounds == 0 {
            return Err(AgentError::Config("max_rounds must be at least 1".into()));
        }

        Ok(Agent::new(provider, tools, self.config))
    }
}
