//! Tool System
//!
//! Everything the orchestration loop knows about tools:
//!
//! - [`ToolCallRequest`] / [`ToolCall`]: what the model asks for, raw and decoded
//! - [`ToolResult`] / [`ContentItem`]: normalized tool output
//! - [`ToolInvoker`]: the dispatch boundary (local registry or remote tool service)
//! - [`ToolRegistry`]: name -> handler table for local [`Tool`] implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Decoded tool arguments
pub type ToolArguments = Map<String, Value>;

/// Tool call request as emitted by the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call identifier, echoed back on the tool message
    pub id: String,

    /// Tool name
    pub name: String,

    /// JSON-encoded argument object
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Decode the argument payload into an object.
    ///
    /// An empty payload is treated as `{}`. Anything that is not a JSON
    /// object is a contract violation by the model.
    pub fn decode(&self) -> Result<ToolCall> {
        let malformed = |reason: String| AgentError::MalformedToolArguments {
            call_id: self.id.clone(),
            tool: self.name.clone(),
            reason,
        };

        let arguments = if self.arguments.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(&self.arguments) {
                Ok(Value::Object(map)) => map,
                Ok(other) => return Err(malformed(format!("expected a JSON object, got {}", other))),
                Err(e) => return Err(malformed(e.to_string())),
            }
        };

        Ok(ToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments,
        })
    }
}

/// Tool call with decoded arguments
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: ToolArguments,
}

/// One unit of a tool result's payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    /// Textual payload
    Text { text: String },

    /// Opaque payload (image, audio, blob); `kind` is the declared type
    Binary {
        kind: String,
        data: String,
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },

    /// Unrecognized item, kept as its string representation
    Unknown { repr: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentItem::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Normalized result of a tool invocation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content items in the order the tool produced them
    pub content: Vec<ContentItem>,

    /// Whether the tool reported a failure
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Successful single-text result
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(output)],
            is_error: false,
        }
    }

    /// Failed single-text result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(message)],
            is_error: true,
        }
    }

    pub fn with_content(mut self, item: ContentItem) -> Self {
        self.content.push(item);
        self
    }

    /// All text items joined by newlines
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentItem::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// JSON encoding placed into the transcript
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Catalog entry offered to the model: name, description, parameter schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Check the definition can be offered to a model
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AgentError::ToolValidation("tool name is empty".into()));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AgentError::ToolValidation(format!(
                "tool name '{}' must match [a-zA-Z0-9_-]+",
                self.name
            )));
        }
        if !self.input_schema.is_object() {
            return Err(AgentError::ToolValidation(format!(
                "input schema of '{}' must be a JSON object",
                self.name
            )));
        }
        Ok(())
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, integer, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(name: &str, param_type: &str, description: &str, default: Value) -> Self {
        Self {
            required: false,
            default: Some(default),
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// Schema of a local tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render as a catalog entry with a JSON-Schema object
    pub fn to_definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            if let Some(values) = &param.enum_values {
                prop["enum"] = Value::Array(values.clone());
            }
            properties.insert(param.name.clone(), prop);
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// Dispatch boundary between the loop and whatever executes tools
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Tools offered to the model
    fn catalog(&self) -> Vec<ToolDefinition>;

    /// Invoke a tool by name
    async fn invoke(&self, name: &str, arguments: &ToolArguments) -> Result<ToolResult>;
}

/// Tool trait - implement to add a local capability
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with decoded arguments
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, arguments: &ToolArguments) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn Tool>,
}

/// Registry of local tools, looked up by name at dispatch time
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    /// Register a shared tool; rejects invalid schemas and duplicate names
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let definition = tool.schema().to_definition();
        definition.validate()?;

        if self.tools.contains_key(&definition.name) {
            return Err(AgentError::ToolValidation(format!(
                "Duplicate tool name: {}",
                definition.name
            )));
        }

        tracing::debug!(tool = %definition.name, "Registered tool");
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler: tool,
            },
        );
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| t.handler.clone())
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    fn catalog(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    async fn invoke(&self, name: &str, arguments: &ToolArguments) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        tool.validate(arguments)?;
        tool.execute(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echo the input".into(),
                parameters: vec![ParameterSchema::required("text", "string", "Text to echo")],
            }
        }

        async fn execute(&self, arguments: &ToolArguments) -> Result<ToolResult> {
            let text = arguments.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(ToolResult::text(text))
        }
    }

    struct BadNameTool;

    #[async_trait]
    impl Tool for BadNameTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "bad name!".into(),
                description: String::new(),
                parameters: Vec::new(),
            }
        }

        async fn execute(&self, _arguments: &ToolArguments) -> Result<ToolResult> {
            Ok(ToolResult::default())
        }
    }

    #[test]
    fn test_decode_arguments() {
        let call = ToolCallRequest::new("c1", "echo", r#"{"text":"hi"}"#).decode().unwrap();
        assert_eq!(call.arguments["text"], "hi");

        let empty = ToolCallRequest::new("c2", "echo", "  ").decode().unwrap();
        assert!(empty.arguments.is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_arguments() {
        let err = ToolCallRequest::new("c1", "echo", "{not json").decode().unwrap_err();
        assert!(matches!(err, AgentError::MalformedToolArguments { ref call_id, .. } if call_id == "c1"));

        let err = ToolCallRequest::new("c2", "echo", "[1, 2]").decode().unwrap_err();
        assert!(matches!(err, AgentError::MalformedToolArguments { .. }));
    }

    #[test]
    fn test_schema_renders_json_schema() {
        let def = EchoTool.schema().to_definition();
        assert_eq!(def.input_schema["type"], "object");
        assert_eq!(def.input_schema["properties"]["text"]["type"], "string");
        assert_eq!(def.input_schema["required"], json!(["text"]));
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_tool_result_json_shape() {
        let json = serde_json::to_value(ToolResult::error("not found")).unwrap();
        assert_eq!(json, json!({"content": [{"type": "text", "text": "not found"}], "isError": true}));
    }

    #[test]
    fn test_registry_rejects_duplicates_and_bad_names() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();

        assert!(matches!(registry.register(EchoTool), Err(AgentError::ToolValidation(_))));
        assert!(matches!(registry.register(BadNameTool), Err(AgentError::ToolValidation(_))));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();

        let mut args = ToolArguments::new();
        args.insert("text".into(), json!("hello"));
        let result = registry.invoke("echo", &args).await.unwrap();
        assert_eq!(result.text_content(), "hello");

        let missing = registry.invoke("echo", &ToolArguments::new()).await;
        assert!(matches!(missing, Err(AgentError::ToolValidation(_))));

        let unknown = registry.invoke("nope", &args).await;
        assert!(matches!(unknown, Err(AgentError::UnknownTool(ref n)) if n == "nope"));
    }
}
