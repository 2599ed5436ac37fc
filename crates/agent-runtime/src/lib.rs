//! # agent-runtime
//!
//! Runtime providers for the agent system.
//!
//! ## Providers
//!
//! - **OpenAI / Azure OpenAI** (default): chat-completions with native tool calling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::openai::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tools(invoker)
//!     .build()?;
//! ```

#[cfg(feature = "openai")]
pub mod convert;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{ApiFlavor, OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use agent_core::{Agent, AgentBuilder, AgentError, LlmProvider, Message, Result, Role};
