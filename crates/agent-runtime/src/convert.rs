//! Chat-completions wire format
//!
//! Conversions between agent messages/tool definitions and the JSON bodies
//! used by OpenAI-compatible chat-completions endpoints.

use std::collections::HashSet;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, TokenUsage},
    tool::{ToolCallRequest, ToolDefinition},
};
use serde_json::{Map, Value, json};

/// Convert the transcript to the `messages` array
pub fn messages_to_openai(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match message.role {
            Role::Assistant => {
                let mut converted = json!({
                    "role": "assistant",
                    "content": message.content,
                });
                if message.has_tool_calls() {
                    let calls: Vec<Value> = message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments,
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = Value::Array(calls);
                }
                converted
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": message.tool_call_id.as_deref().unwrap_or_default(),
                "content": message.text(),
            }),
            role => json!({
                "role": role.to_string(),
                "content": message.text(),
            }),
        })
        .collect()
}

/// Convert the catalog to the `tools` array
pub fn tools_to_openai(tools: &[ToolDefinition]) -> Result<Vec<Value>> {
    let mut names = HashSet::new();
    let mut result = Vec::with_capacity(tools.len());

    for tool in tools {
        if !names.insert(tool.name.as_str()) {
            return Err(AgentError::ToolValidation(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Build the request body
pub fn build_payload(
    messages: &[Message],
    tools: &[ToolDefinition],
    options: &GenerationOptions,
) -> Result<Value> {
    let mut payload = Map::new();
    payload.insert("model".into(), json!(options.model));
    payload.insert("messages".into(), Value::Array(messages_to_openai(messages)));

    if !tools.is_empty() {
        payload.insert("tools".into(), Value::Array(tools_to_openai(tools)?));
        payload.insert("tool_choice".into(), json!(options.tool_choice.as_str()));
    }
    if let Some(temperature) = options.temperature {
        payload.insert("temperature".into(), json!(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        payload.insert("max_tokens".into(), json!(max_tokens));
    }

    Ok(Value::Object(payload))
}

/// Convert a response body into a completion
pub fn openai_response_to_completion(response: &Value, requested_model: &str) -> Result<Completion> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let detail = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(AgentError::Provider(format!("API error: {}", detail)));
    }

    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| AgentError::Provider("Response contained no choices".into()))?;

    let original = &choice["message"];
    let content = original
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string);

    let tool_calls = original
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().map(tool_call_from_openai).collect())
        .unwrap_or_default();

    let model = response
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(requested_model)
        .to_string();

    Ok(Completion {
        message: Message::assistant_with_tool_calls(content, tool_calls),
        model,
        usage: response.get("usage").map(usage_from_openai),
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(FinishReason::parse),
    })
}

// Arguments stay raw; the loop decides what to do with undecodable ones
fn tool_call_from_openai(call: &Value) -> ToolCallRequest {
    let function = &call["function"];
    let arguments = match &function["arguments"] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    ToolCallRequest::new(
        call["id"].as_str().unwrap_or_default(),
        function["name"].as_str().unwrap_or_default(),
        arguments,
    )
}

fn usage_from_openai(usage: &Value) -> TokenUsage {
    let count = |key: &str| {
        usage
            .get(key)
            .and_then(Value::as_u64)
            .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX))
    };

    let prompt_tokens = count("prompt_tokens");
    let completion_tokens = count("completion_tokens");
    let total_tokens = match count("total_tokens") {
        0 => prompt_tokens.saturating_add(completion_tokens),
        total => total,
    };

    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    }
}
