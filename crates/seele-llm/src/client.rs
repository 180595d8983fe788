use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    error::{LlmError, Result},
    types::{ChatMessage, ToolCall, ToolDefinition, ToolResult, WireRole},
    wire::{ApiResponse, ChatRequestBody},
};

/// Maximum tool-call round-trips per turn before giving up and returning the
/// last assistant message as-is.
const MAX_TOOL_ITERATIONS: usize = 25;

/// Executes a named tool given its JSON-encoded arguments. Implemented by
/// the crate that owns the tool registry (kept out of `seele-llm` to avoid
/// a circular dependency).
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, arguments: &str) -> ToolResult;
}

/// Dual-role client over one OpenAI-compatible HTTP endpoint: `chat_model`
/// for user-facing turns (always used in the tool loop, even though tools
/// are nominally a background concern) and `tool_model` for summarization /
/// profile-update background calls.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    tool_model: String,
    chat_reasoning_effort: String,
    tool_reasoning_effort: String,
}

impl LlmClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        tool_model: impl Into<String>,
        chat_reasoning_effort: impl Into<String>,
        tool_reasoning_effort: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            tool_model: tool_model.into(),
            chat_reasoning_effort: chat_reasoning_effort.into(),
            tool_reasoning_effort: tool_reasoning_effort.into(),
        }
    }

    /// Run the conversational model with a fixed message list and no tools.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let resp = self
            .send(&self.chat_model, messages, None, &self.chat_reasoning_effort)
            .await?;
        Ok(resp.content.unwrap_or_default())
    }

    /// Run the conversational model with a tool-call loop: while the model
    /// requests tool calls, execute them via `executor` and re-issue,
    /// appending the assistant message (preserving `reasoning_content`) and
    /// one `tool` message per call. Always uses `chat_model`.
    pub async fn chat_with_tools(
        &self,
        mut messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
        executor: &dyn ToolExecutor,
    ) -> Result<String> {
        let tool_defs: Vec<serde_json::Value> = tools.iter().map(ToolDefinition::to_wire).collect();

        for _ in 0..MAX_TOOL_ITERATIONS {
            let parsed = self
                .send(
                    &self.chat_model,
                    &messages,
                    if tool_defs.is_empty() {
                        None
                    } else {
                        Some(tool_defs.clone())
                    },
                    &self.chat_reasoning_effort,
                )
                .await?;

            let Some(tool_calls) = parsed.tool_calls.filter(|c| !c.is_empty()) else {
                return Ok(parsed.content.unwrap_or_default());
            };

            messages.push(ChatMessage {
                role: WireRole::Assistant,
                content: parsed.content,
                tool_calls: Some(tool_calls.clone()),
                tool_call_id: None,
                reasoning_content: parsed.reasoning_content,
            });

            for call in &tool_calls {
                let result = executor.execute(&call.function.name, &call.function.arguments).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result.content));
            }
        }

        warn!("tool loop exceeded {MAX_TOOL_ITERATIONS} iterations");
        Err(LlmError::MaxIterationsExceeded(MAX_TOOL_ITERATIONS))
    }

    /// Summarize a batch of messages. ≤300 words, third person, chronology
    /// preserved, covering only the provided messages.
    pub async fn generate_summary(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatMessage::system(prompt)];
        let resp = self
            .send(&self.tool_model, &messages, None, &self.tool_reasoning_effort)
            .await?;
        Ok(resp.content.unwrap_or_default())
    }

    /// Generate a JSON-Patch (RFC 6902) array as raw text, per the patch
    /// prompt contract in `SPEC_FULL.md` §4.6.
    pub async fn generate_memory_update(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatMessage::system(prompt)];
        let resp = self
            .send(&self.tool_model, &messages, None, &self.tool_reasoning_effort)
            .await?;
        Ok(resp.content.unwrap_or_default())
    }

    /// Generate a full replacement profile document as raw text, used only
    /// as the fallback when patch generation/application fails.
    pub async fn generate_complete_profile_json(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatMessage::system(prompt)];
        let resp = self
            .send(&self.tool_model, &messages, None, &self.tool_reasoning_effort)
            .await?;
        Ok(resp.content.unwrap_or_default())
    }

    async fn send(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<Vec<serde_json::Value>>,
        reasoning_effort: &str,
    ) -> Result<ParsedMessage> {
        let body = ChatRequestBody {
            model,
            messages,
            tools,
            reasoning_effort: if reasoning_effort.is_empty() {
                None
            } else {
                Some(reasoning_effort)
            },
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ApiResponse = resp.json().await?;
        let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
        info!(model, "chat completion received");
        Ok(ParsedMessage {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
            reasoning_content: choice.message.reasoning_content,
        })
    }
}

struct ParsedMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
    reasoning_content: Option<String>,
}
