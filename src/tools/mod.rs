//! Tools the model can call during a chat.
//!
//! Tools are registered explicitly in a [`ToolRegistry`] under their name. The
//! registry advertises their definitions to the model and dispatches the
//! model's tool calls to the typed implementation, decoding the JSON arguments
//! on the way in.

pub mod file_reader;

pub use file_reader::{FileReaderTool, ReadFileArgs, READ_FILE_TOOL};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::types::{ToolCall, ToolDefinition};

/// Result of a tool execution. Both sides carry text for the model; the flag
/// lets callers tell a failure apart without inspecting the message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

impl<E: std::fmt::Display> From<Result<String, E>> for ToolOutput {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(content) => Self::success(content),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// A typed tool.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Args: DeserializeOwned + Send;

    fn definition(&self) -> ToolDefinition;

    async fn call(&self, args: Self::Args) -> ToolOutput;
}

/// Object-safe view of a [`Tool`] taking raw JSON arguments.
#[async_trait]
trait DynTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call_json(&self, arguments: &str) -> ToolOutput;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn call_json(&self, arguments: &str) -> ToolOutput {
        // some models send an empty string for argument-less calls
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
        match serde_json::from_str::<T::Args>(arguments) {
            Ok(args) => self.call(args).await,
            Err(e) => ToolOutput::failure(format!(
                "Invalid arguments for tool '{}': {}",
                Tool::definition(self).name,
                e
            )),
        }
    }
}

/// Registry of available tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn DynTool>>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the file reader tool.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FileReaderTool::default());
        registry
    }

    /// Registers a tool under the name from its definition, replacing any tool
    /// with the same name.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let name = Tool::definition(&tool).name;
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Definitions of all tools, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Executes a tool call. Never fails: unknown tools and bad arguments come
    /// back as failure outputs for the model to read.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let name = &call.function.name;
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, call_id = %call.id, "Model called an unknown tool");
            return ToolOutput::failure(format!("Tool '{}' not found", name));
        };

        info!(tool = %name, call_id = %call.id, "Executing tool call");
        let output = tool.call_json(&call.function.arguments).await;
        if output.is_error {
            warn!(tool = %name, call_id = %call.id, error = %output.content, "Tool call failed");
        }
        output
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        type Args = EchoArgs;

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }
        }

        async fn call(&self, args: EchoArgs) -> ToolOutput {
            ToolOutput::success(args.text)
        }
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = ToolRegistry::with_defaults();
        assert!(registry.has_tool(READ_FILE_TOOL));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].name, READ_FILE_TOOL);
    }

    #[tokio::test]
    async fn test_execute_decodes_typed_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let output = registry
            .execute(&ToolCall::new("call_1", "echo", r#"{"text":"ping"}"#))
            .await;
        assert_eq!(output, ToolOutput::success("ping"));
    }

    #[tokio::test]
    async fn test_execute_reports_bad_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let output = registry
            .execute(&ToolCall::new("call_1", "echo", r#"{"wrong":1}"#))
            .await;
        assert!(output.is_error);
        assert!(output.content.contains("Invalid arguments for tool 'echo'"));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let output = registry.execute(&ToolCall::new("call_1", "missing", "{}")).await;
        assert_eq!(output, ToolOutput::failure("Tool 'missing' not found"));
    }
}
