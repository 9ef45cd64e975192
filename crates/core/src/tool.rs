//! Tool trait: the abstraction over assistant capabilities.
//!
//! Tools are what let the assistant act on a user's library: list and read
//! links, organise folders, file links into folders. A tool never fails
//! the run; every problem comes back as an error-status [`ToolOutput`]
//! that the model can read and react to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ToolError;
use crate::message::{ToolStatus, ToolUse};

/// Reply sent to the model when it names a tool that is not registered.
pub const TOOL_NOT_FOUND: &str = "The selected tool does not exist.";

/// A tool descriptor sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool name, unique within a registry
    pub name: String,

    /// Description the model uses to decide when the tool applies
    pub description: String,

    /// JSON Schema describing the tool's input
    pub input_schema: serde_json::Value,
}

/// The result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub status: ToolStatus,
    pub text: String,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

impl From<Result<String, ToolError>> for ToolOutput {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// The core Tool trait.
///
/// Each concrete tool wraps a single domain-controller call. Tools are
/// registered in the [`ToolRegistry`] and made available to the agent loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static descriptor for this tool.
    fn spec(&self) -> ToolSpec;

    /// Run the tool against the raw JSON input streamed by the model.
    async fn invoke(&self, invocation_id: &str, raw_input: &str) -> ToolOutput;
}

/// A registry of available tools, keyed by spec name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.spec().name;
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool specs, ordered by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    /// Run a tool and wrap its output as a response [`ToolUse`].
    ///
    /// Unknown names produce an error response, never a failure.
    pub async fn dispatch(&self, name: &str, invocation_id: &str, raw_input: &str) -> ToolUse {
        let output = match self.tools.get(name) {
            Some(tool) => tool.invoke(invocation_id, raw_input).await,
            None => {
                tracing::warn!(tool = %name, invocation_id, "Model requested an unknown tool");
                ToolOutput::error(TOOL_NOT_FOUND)
            }
        };
        ToolUse::response(invocation_id, name, output.status, output.text)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".into(),
                description: "Echoes back the input".into(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" }
                    },
                    "required": ["text"]
                }),
            }
        }

        async fn invoke(&self, _invocation_id: &str, raw_input: &str) -> ToolOutput {
            match serde_json::from_str::<serde_json::Value>(raw_input) {
                Ok(v) => ToolOutput::success(v["text"].as_str().unwrap_or("")),
                Err(e) => ToolOutput::error(e.to_string()),
            }
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_specs() {
        let mut registry = ToolRegistry::new();
        assert!(registry.specs().is_empty());
        registry.register(Box::new(EchoTool));
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
    }

    #[tokio::test]
    async fn dispatch_wraps_output_as_response() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let resp = registry.dispatch("echo", "call_1", r#"{"text":"hello world"}"#).await;
        assert_eq!(resp.id, "call_1");
        assert_eq!(resp.name, "echo");
        assert_eq!(resp.status(), Some(ToolStatus::Success));
        assert_eq!(resp.text(), Some("hello world"));
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_an_error_response() {
        let registry = ToolRegistry::new();
        let resp = registry.dispatch("nonexistent", "call_1", "{}").await;
        assert_eq!(resp.id, "call_1");
        assert_eq!(resp.status(), Some(ToolStatus::Error));
        assert_eq!(resp.text(), Some(TOOL_NOT_FOUND));
    }

    #[test]
    fn output_from_tool_error() {
        let out = ToolOutput::from(Err(ToolError::MissingField("name")));
        assert!(!out.is_success());
        assert!(out.text.contains("name"));
    }
}
