//! Conversation Driver — thin orchestrator. Per user turn: store the
//! message (with embedding), retrieve related long-term memory, compose and
//! run the prompt through the LLM's tool loop, then store the reply and let
//! the memory manager decide on summarization/profile updates. Also
//! implements the scheduler callback so fired tasks run the same path with
//! a system-originated message that is never itself saved to history.

use std::sync::Arc;

use async_trait::async_trait;

use seele_core::clock;
use seele_llm::LlmClient;
use seele_memory::MemoryManager;
use seele_scheduler::TaskCallback;
use seele_store::ScheduledTask;

use crate::{error::Result, tools::ToolRegistry};

pub struct ConversationDriver {
    memory: Arc<MemoryManager>,
    llm: Arc<LlmClient>,
    tools: Arc<ToolRegistry>,
    new_session_command: String,
    reset_session_command: String,
}

impl ConversationDriver {
    pub fn new(
        memory: Arc<MemoryManager>,
        llm: Arc<LlmClient>,
        tools: Arc<ToolRegistry>,
        new_session_command: String,
        reset_session_command: String,
    ) -> Self {
        Self {
            memory,
            llm,
            tools,
            new_session_command,
            reset_session_command,
        }
    }

    /// Handle one turn of text from the transport. Session commands bypass
    /// the normal retrieval/LLM path entirely.
    pub async fn handle_turn(&self, text: &str) -> Result<String> {
        let trimmed = text.trim();
        if trimmed == self.new_session_command {
            self.memory.new_session().await?;
            return Ok("Started a new session.".to_string());
        }
        if trimmed == self.reset_session_command {
            self.memory.reset_session().await?;
            return Ok("Session reset; all history for it was deleted.".to_string());
        }

        let (_, embedding) = self.memory.add_user_message(trimmed).await?;
        let last_bot_message = self.last_assistant_message();

        let retrieval = self
            .memory
            .process_user_input(trimmed, last_bot_message.as_deref(), Some(embedding))
            .await?;

        let reply = self.run_llm_turn(trimmed, &retrieval, true).await?;

        self.memory.add_assistant_message(&reply).await?;
        Ok(reply)
    }

    /// `current_input_in_window` is true for live turns, whose user message
    /// `add_user_message` already appended to the window (so the tail entry
    /// is dropped to avoid duplicating it via `build_turn_messages`'s own
    /// emphasized copy). Scheduled-task turns never append their trigger
    /// message to the window, so the full window is used as-is.
    async fn run_llm_turn(
        &self,
        current_input: &str,
        retrieval: &seele_memory::RetrievalResult,
        current_input_in_window: bool,
    ) -> Result<String> {
        let profile = self.memory.profile_document()?;
        let (system_prompt, window_messages) = {
            let window = self.memory.window();
            let recent_summaries: Vec<(i64, String)> = window
                .recent_summaries()
                .iter()
                .map(|s| (s.id, s.text.clone()))
                .collect();
            let prompt = seele_llm::prompts::build_system_prompt(&profile, &recent_summaries);
            let mut messages = window.as_chat_messages();
            if current_input_in_window {
                messages.pop();
            }
            (prompt, messages)
        };

        let current_time_str = clock::timestamp_to_str(clock::now_secs(), self.memory.timezone());

        let messages = seele_llm::prompts::build_turn_messages(
            system_prompt,
            &window_messages,
            retrieval.summaries_text.as_deref(),
            retrieval.conversations_text.as_deref(),
            &current_time_str,
            current_input,
        );

        let reply = self
            .llm
            .chat_with_tools(messages, &self.tools.definitions(), self.tools.as_ref())
            .await?;
        Ok(reply)
    }

    fn last_assistant_message(&self) -> Option<String> {
        let window = self.memory.window();
        window
            .messages()
            .iter()
            .rev()
            .find(|m| matches!(m.role, seele_core::Role::Assistant))
            .map(|m| m.text.clone())
    }
}

/// The scheduler invokes this when a task fires. The task's `message` is
/// treated as a system-originated request: it runs through retrieval and
/// the LLM chat path with the message as the current turn's input, but it
/// is never saved to history itself — only the resulting reply is.
#[async_trait]
impl TaskCallback for ConversationDriver {
    async fn on_task_fired(&self, task: &ScheduledTask) -> std::result::Result<(), String> {
        let last_bot_message = self.last_assistant_message();

        let retrieval = self
            .memory
            .process_user_input(&task.message, last_bot_message.as_deref(), None)
            .await
            .map_err(|e| e.to_string())?;

        let reply = self
            .run_llm_turn(&task.message, &retrieval, false)
            .await
            .map_err(|e| e.to_string())?;

        self.memory
            .add_assistant_message(&reply)
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn driver_is_send_sync() {
        _assert_send_sync::<ConversationDriver>();
    }
}
