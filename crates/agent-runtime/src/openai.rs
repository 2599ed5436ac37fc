//! OpenAI / Azure OpenAI Provider
//!
//! Implementation of `LlmProvider` over the chat-completions REST API with
//! native tool calling.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, GenerationOptions, LlmProvider},
    tool::ToolDefinition,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::convert::{build_payload, openai_response_to_completion};

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which dialect of the API to speak
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `{endpoint}/openai/deployments/{deployment}/chat/completions`, `api-key` header
    Azure,
    /// `{base}/v1/chat/completions`, bearer token
    OpenAi,
}

/// Provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub flavor: ApiFlavor,

    /// Azure resource endpoint or OpenAI base URL
    pub endpoint: String,

    pub api_key: String,

    /// Azure only
    pub api_version: String,

    /// Default model (deployment name on Azure)
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Azure OpenAI configuration
    pub fn azure(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            flavor: ApiFlavor::Azure,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_AZURE_API_VERSION.into(),
            model: agent_core::provider::DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Plain OpenAI configuration
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            flavor: ApiFlavor::OpenAi,
            endpoint: DEFAULT_OPENAI_BASE_URL.into(),
            api_key: api_key.into(),
            api_version: String::new(),
            model: agent_core::provider::DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// Azure settings win when `AZURE_OPENAI_ENDPOINT` is present; otherwise
    /// `OPENAI_API_KEY` selects the OpenAI API.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = if let Some(endpoint) = get("AZURE_OPENAI_ENDPOINT") {
            let api_key = get("AZURE_OPENAI_API_KEY").ok_or_else(|| {
                AgentError::Config("AZURE_OPENAI_API_KEY is required with AZURE_OPENAI_ENDPOINT".into())
            })?;
            let mut config = Self::azure(endpoint, api_key);
            if let Some(version) = get("AZURE_OPENAI_API_VERSION") {
                config.api_version = version;
            }
            if let Some(model) = get("AZURE_OPENAI_MODEL") {
                config.model = model;
            }
            config
        } else if let Some(api_key) = get("OPENAI_API_KEY") {
            let mut config = Self::openai(api_key);
            if let Some(base) = get("OPENAI_BASE_URL") {
                config.endpoint = base;
            }
            if let Some(model) = get("OPENAI_MODEL") {
                config.model = model;
            }
            config
        } else {
            return Err(AgentError::Config(
                "Set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY, or OPENAI_API_KEY".into(),
            ));
        };

        if let Some(timeout) = get("OPENAI_TIMEOUT_SECS") {
            config.timeout_secs = timeout
                .parse()
                .map_err(|_| AgentError::Config(format!("Invalid OPENAI_TIMEOUT_SECS: {}", timeout)))?;
        }

        Ok(config)
    }
}

/// Chat-completions provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// Model used when the caller does not pick one
    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn base(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    fn completions_url(&self, model: &str) -> String {
        match self.config.flavor {
            ApiFlavor::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base(),
                model,
                self.config.api_version
            ),
            ApiFlavor::OpenAi => format!("{}/v1/chat/completions", self.base()),
        }
    }

    fn models_url(&self) -> String {
        match self.config.flavor {
            ApiFlavor::Azure => format!(
                "{}/openai/models?api-version={}",
                self.base(),
                self.config.api_version
            ),
            ApiFlavor::OpenAi => format!("{}/v1/models", self.base()),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.flavor {
            ApiFlavor::Azure => request.header("api-key", &self.config.api_key),
            ApiFlavor::OpenAi => request.bearer_auth(&self.config.api_key),
        }
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<Value> {
        let response = self
            .authorize(self.client.post(url))
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AgentError::Provider(format!("Invalid response body: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

fn transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> AgentError {
    let detail = format!("{}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(format!("Request failed with {}", detail)),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        match self.config.flavor {
            ApiFlavor::Azure => "azure-openai",
            ApiFlavor::OpenAi => "openai",
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self.authorize(self.client.get(self.models_url())).send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Provider health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Provider health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let model = if options.model.is_empty() {
            self.config.model.as_str()
        } else {
            options.model.as_str()
        };

        let mut payload = build_payload(messages, tools, options)?;
        payload["model"] = Value::String(model.to_string());

        tracing::debug!(
            provider = self.name(),
            model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat completion"
        );

        let response = self.post(&self.completions_url(model), &payload).await?;
        let completion = openai_response_to_completion(&response, model)?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion usage"
            );
        }

        Ok(completion)
    }
}
