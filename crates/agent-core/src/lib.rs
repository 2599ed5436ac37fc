//! # agent-core
//!
//! Tool-calling orchestration loop with provider-agnostic LLM and tool-invoker abstractions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Agent                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ Orchestration│   │ ToolInvoker  │   │   LlmProvider    │  │
//! │  │     Loop     │───│ (registry or │───│    (Strategy)    │  │
//! │  │              │   │  MCP client) │   │                  │  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the loop run against OpenAI, Azure OpenAI or a
//! scripted provider; the `ToolInvoker` trait lets tools live in-process or
//! behind a remote tool service.

pub mod error;
pub mod extract;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, Result};
pub use extract::extract;
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider, ToolChoice};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, CaptureRules, OrchestrationOutcome};
pub use tool::{
    ContentItem, Tool, ToolArguments, ToolCall, ToolCallRequest, ToolDefinition, ToolInvoker,
    ToolRegistry, ToolResult, ToolSchema,
};
