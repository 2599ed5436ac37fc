//! # agent-mcp
//!
//! Model Context Protocol over streamable HTTP.
//!
//! - [`client::McpClient`]: session-scoped client; implements `ToolInvoker`
//!   so the orchestration loop can call remote tools
//! - [`server::McpServer`]: hosts any `ToolInvoker` at `/mcp`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_mcp::{McpClientConfig, with_session};
//!
//! let outcome = with_session(McpClientConfig::from_env()?, |client| async move {
//!     let agent = AgentBuilder::new()
//!         .provider(provider)
//!         .tools(Arc::new(client))
//!         .build()?;
//!     agent.run("List all customers").await
//! })
//! .await?;
//! ```

pub mod client;
pub mod error;
pub mod server;
pub mod sse;
pub mod types;

pub use client::{McpClient, McpClientConfig, with_session};
pub use error::{McpError, Result};
pub use server::{McpServer, router};
pub use types::{PROTOCOL_VERSION, SESSION_HEADER};
