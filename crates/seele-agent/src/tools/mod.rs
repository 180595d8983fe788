//! Tool system for AI agent tool calling: the `Tool` trait plus a registry
//! that converts tools to LLM API definitions and dispatches calls back to
//! them for `seele_llm::LlmClient::chat_with_tools`.

pub mod scheduled_task;
pub mod search_memories;

use async_trait::async_trait;
use serde_json::Value;

use seele_llm::{ToolDefinition, ToolExecutor, ToolResult};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> ToolResult;
}

/// Holds the fixed set of tools available to the conversation driver and
/// dispatches by name for the LLM client's tool-call loop.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.input_schema(),
            })
            .collect()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, arguments: &str) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return ToolResult::error(format!("unknown tool: {name}"));
        };

        let input: Value = if arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str(arguments) {
                Ok(v) => v,
                Err(e) => return ToolResult::error(format!("invalid tool arguments: {e}")),
            }
        };

        tool.execute(input).await
    }
}
