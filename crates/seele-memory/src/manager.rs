use std::sync::{Arc, Mutex};

use seele_core::{clock, Role, SeeleConfig};
use seele_llm::{EmbeddingClient, LlmClient, RerankerClient};
use seele_profile::ProfileStore;
use seele_store::Store;
use tracing::{info, warn};

use crate::{
    error::{MemoryError, Result},
    retriever::{RetrievalResult, Retriever},
    types::SummarizeOutcome,
    window::ContextWindow,
};

const FULL_PROFILE_RETRIES: usize = 2;

/// Orchestrates everything session-scoped: the live `ContextWindow`, the
/// store, and the LLM/embedding/rerank/profile clients. Turns a user
/// message into stored state and a retrieval-ready prompt, and decides
/// when automatic summarization and long-term profile updates happen.
pub struct MemoryManager {
    store: Arc<Store>,
    profile: ProfileStore,
    llm: LlmClient,
    embedding: EmbeddingClient,
    reranker: RerankerClient,
    window: Mutex<ContextWindow>,
    session_id: Mutex<i64>,
    keep_min: usize,
    trigger_summary: usize,
    recent_summaries_max: usize,
    recall_summary_per_query: usize,
    recall_conv_per_summary: usize,
    rerank_top_summaries: usize,
    rerank_top_convs: usize,
    timezone: String,
}

impl MemoryManager {
    pub fn new(
        config: &SeeleConfig,
        store: Arc<Store>,
        profile: ProfileStore,
        llm: LlmClient,
        embedding: EmbeddingClient,
        reranker: RerankerClient,
    ) -> Self {
        Self {
            store,
            profile,
            llm,
            embedding,
            reranker,
            window: Mutex::new(ContextWindow::new(config.memory.recent_summaries_max)),
            session_id: Mutex::new(0),
            keep_min: config.memory.context_window_keep_min,
            trigger_summary: config.memory.context_window_trigger_summary,
            recent_summaries_max: config.memory.recent_summaries_max,
            recall_summary_per_query: config.memory.recall_summary_per_query,
            recall_conv_per_summary: config.memory.recall_conv_per_summary,
            rerank_top_summaries: config.memory.rerank_top_summaries,
            rerank_top_convs: config.memory.rerank_top_convs,
            timezone: config.timezone.clone(),
        }
    }

    pub fn session_id(&self) -> i64 {
        *self.session_id.lock().unwrap()
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// The current profile document, for system-prompt composition.
    pub fn profile_document(&self) -> Result<serde_json::Value> {
        Ok(self.profile.load()?)
    }

    fn retriever(&self) -> Retriever<'_> {
        Retriever::new(
            &self.store,
            &self.embedding,
            &self.reranker,
            self.recall_summary_per_query,
            self.recall_conv_per_summary,
            self.rerank_top_summaries,
            self.rerank_top_convs,
            self.timezone.clone(),
        )
    }

    /// Create a session if none is active, otherwise rebuild the
    /// `ContextWindow` from stored state so a resumed session continues
    /// coherently.
    pub async fn restore_or_start_session(&self) -> Result<()> {
        let now = clock::now_secs();

        let active = self.store.get_active_session()?;
        let session_id = match &active {
            None => self.store.create_session(now)?,
            Some(session) => session.id,
        };
        *self.session_id.lock().unwrap() = session_id;

        if active.is_none() {
            return Ok(());
        }

        let mut window = ContextWindow::new(self.recent_summaries_max);

        let mut summaries = self.store.get_summaries_by_session(session_id)?;
        summaries.truncate(self.recent_summaries_max);
        summaries.reverse();
        for s in &summaries {
            window.add_summary(s.id, s.summary.clone());
        }

        let unsummarized = self.store.get_unsummarized_conversations(session_id)?;
        let count = unsummarized.len();

        if count <= self.keep_min {
            for m in unsummarized {
                window.add_message(m.role, m.text, m.timestamp);
            }
        } else if count >= self.trigger_summary {
            let to_summarize = count - self.keep_min;
            let mut idx = 0;
            while idx < to_summarize {
                let end = (idx + self.keep_min).min(to_summarize);
                let batch = &unsummarized[idx..end];
                self.summarize_batch_during_restore(session_id, batch, &mut window)
                    .await?;
                idx = end;
            }
            for m in &unsummarized[to_summarize..] {
                window.add_message(m.role, m.text.clone(), m.timestamp);
            }
        } else {
            for m in unsummarized {
                window.add_message(m.role, m.text, m.timestamp);
            }
        }

        *self.window.lock().unwrap() = window;
        Ok(())
    }

    /// Embed, persist, and append a user message. Returns `(id, embedding)`
    /// so the caller can reuse the embedding for retrieval.
    pub async fn add_user_message(&self, text: &str) -> Result<(i64, Vec<f32>)> {
        let session_id = self.require_session()?;
        let now = clock::now_secs();
        let embedding = self.embedding.embed(text).await?;
        let id = self
            .store
            .insert_conversation(session_id, now, Role::User, text, Some(&embedding))?;
        self.window.lock().unwrap().add_message(Role::User, text.to_string(), now);
        Ok((id, embedding))
    }

    /// Retrieve related long-term memory for the current turn.
    pub async fn process_user_input(
        &self,
        query: &str,
        last_bot_message: Option<&str>,
        query_embedding: Option<Vec<f32>>,
    ) -> Result<RetrievalResult> {
        let exclude_ids = self.window.lock().unwrap().recent_summary_ids();
        let result = self
            .retriever()
            .retrieve(query, last_bot_message, query_embedding, None, &exclude_ids)
            .await?;
        Ok(result)
    }

    /// Embed, persist, and append an assistant message, then maybe summarize.
    pub async fn add_assistant_message(&self, text: &str) -> Result<Option<SummarizeOutcome>> {
        let session_id = self.require_session()?;
        let now = clock::now_secs();
        let embedding = self.embedding.embed(text).await?;
        self.store
            .insert_conversation(session_id, now, Role::Assistant, text, Some(&embedding))?;
        self.window
            .lock()
            .unwrap()
            .add_message(Role::Assistant, text.to_string(), now);
        self.maybe_summarize(session_id).await
    }

    async fn maybe_summarize(&self, session_id: i64) -> Result<Option<SummarizeOutcome>> {
        let total = self.window.lock().unwrap().total_message_count();
        if total < self.trigger_summary {
            return Ok(None);
        }

        let prefix_len = total - self.keep_min;
        let prefix = {
            let window = self.window.lock().unwrap();
            window.messages_for_summary(self.keep_min).to_vec()
        };

        let summary_id = self.summarize_batch_into_store(session_id, &prefix).await?;
        let summary_text = self
            .store
            .get_summary_by_id(summary_id)?
            .map(|s| s.summary)
            .unwrap_or_default();
        {
            let mut window = self.window.lock().unwrap();
            window.add_summary(summary_id, summary_text);
            window.remove_earliest_messages(prefix_len);
        }

        let profile_updated = self
            .update_profile_for_batch(&prefix)
            .await
            .unwrap_or_else(|e| {
                warn!("long-term profile update failed, proceeding without it: {e}");
                false
            });

        Ok(Some(SummarizeOutcome {
            summary_id,
            profile_updated,
        }))
    }

    /// Used only during session restoration: each batch also gets pushed
    /// straight into the (not-yet-installed) window's recent-summary
    /// compartment rather than the live one.
    async fn summarize_batch_during_restore(
        &self,
        session_id: i64,
        batch: &[seele_store::Conversation],
        window: &mut ContextWindow,
    ) -> Result<()> {
        let messages: Vec<crate::types::WindowMessage> = batch
            .iter()
            .map(|c| crate::types::WindowMessage {
                role: c.role,
                text: c.text.clone(),
                timestamp: c.timestamp,
            })
            .collect();
        let summary_id = self.summarize_batch_into_store(session_id, &messages).await?;
        let text = self
            .store
            .get_summary_by_id(summary_id)?
            .map(|s| s.summary)
            .unwrap_or_default();
        window.add_summary(summary_id, text);
        self.update_profile_for_batch(&messages).await.unwrap_or_else(|e| {
            warn!("long-term profile update failed during restoration: {e}");
            false
        });
        Ok(())
    }

    /// Summarize `batch`, embed and store the summary, return its id.
    async fn summarize_batch_into_store(
        &self,
        session_id: i64,
        batch: &[crate::types::WindowMessage],
    ) -> Result<i64> {
        let first_timestamp = batch.first().map(|m| m.timestamp).unwrap_or_else(clock::now_secs);
        let last_timestamp = batch.last().map(|m| m.timestamp).unwrap_or(first_timestamp);
        let text = render_messages(batch);
        let prompt = seele_llm::prompts::summary_prompt(&text);
        let summary = self.llm.generate_summary(&prompt).await?;
        let embedding = self.embedding.embed(&summary).await?;
        let id = self
            .store
            .insert_summary(session_id, &summary, first_timestamp, last_timestamp, Some(&embedding))?;
        info!(session_id, summary_id = id, "created summary");
        Ok(id)
    }

    /// Generate a JSON-Patch against the profile, apply it, and on any
    /// failure fall back to full-document regeneration (up to 2 retries).
    async fn update_profile_for_batch(&self, batch: &[crate::types::WindowMessage]) -> Result<bool> {
        let first_timestamp = batch.first().map(|m| m.timestamp).unwrap_or_else(clock::now_secs);
        let last_timestamp = batch.last().map(|m| m.timestamp).unwrap_or(first_timestamp);
        let messages_text = render_messages(batch);
        let current_profile = self.profile.load()?;
        let current_profile_json = serde_json::to_string(&current_profile)?;

        let prompt = seele_llm::prompts::memory_update_prompt(
            &messages_text,
            &current_profile_json,
            first_timestamp,
            last_timestamp,
        );
        let raw = self.llm.generate_memory_update(&prompt).await?;

        let mut last_error = match extract_json_array(&raw) {
            Some(array_text) => match serde_json::from_str::<json_patch::Patch>(&array_text) {
                Ok(patch) => match self.profile.apply_patch(&patch) {
                    Ok(true) => return Ok(true),
                    Ok(false) => "patch application failed validation".to_string(),
                    Err(e) => e.to_string(),
                },
                Err(e) => format!("patch did not parse as a JSON Patch array: {e}"),
            },
            None => "response did not contain a JSON array".to_string(),
        };

        for _ in 0..FULL_PROFILE_RETRIES {
            let fallback_prompt = seele_llm::prompts::full_profile_prompt(
                &messages_text,
                &current_profile_json,
                &last_error,
                first_timestamp,
                last_timestamp,
            );
            let raw = self.llm.generate_complete_profile_json(&fallback_prompt).await?;
            match extract_json_object(&raw) {
                Some(object_text) => match serde_json::from_str::<serde_json::Value>(&object_text) {
                    Ok(mut doc) => {
                        seele_profile::document::truncate_memorable_events(&mut doc);
                        if seele_profile::document::validate(&doc).is_ok() {
                            self.profile.replace(doc)?;
                            return Ok(true);
                        }
                        last_error = "regenerated profile failed validation".to_string();
                    }
                    Err(e) => last_error = format!("regenerated profile did not parse: {e}"),
                },
                None => last_error = "regenerated response did not contain a JSON object".to_string(),
            }
        }

        warn!("abandoning profile update after exhausting retries: {last_error}");
        Ok(false)
    }

    /// Summarize everything remaining in the window (regardless of
    /// threshold), run one final profile update, close the session, and
    /// start a fresh one.
    pub async fn new_session(&self) -> Result<()> {
        let session_id = self.require_session()?;
        let remaining = self.window.lock().unwrap().messages().to_vec();
        if !remaining.is_empty() {
            let _summary_id = self.summarize_batch_into_store(session_id, &remaining).await?;
            self.update_profile_for_batch(&remaining).await.unwrap_or_else(|e| {
                warn!("long-term profile update failed on session close: {e}");
                false
            });
        }
        let now = clock::now_secs();
        self.store.close_session(session_id, now)?;
        let new_id = self.store.create_session(now)?;
        *self.session_id.lock().unwrap() = new_id;
        self.window.lock().unwrap().clear();
        Ok(())
    }

    /// Delete the current session and all its data; start a fresh one with
    /// no summarization or profile update.
    pub async fn reset_session(&self) -> Result<()> {
        let session_id = self.require_session()?;
        self.store.delete_session(session_id)?;
        let now = clock::now_secs();
        let new_id = self.store.create_session(now)?;
        *self.session_id.lock().unwrap() = new_id;
        self.window.lock().unwrap().clear();
        Ok(())
    }

    pub fn window(&self) -> std::sync::MutexGuard<'_, ContextWindow> {
        self.window.lock().unwrap()
    }

    fn require_session(&self) -> Result<i64> {
        let id = *self.session_id.lock().unwrap();
        if id == 0 {
            return Err(MemoryError::NoActiveSession);
        }
        Ok(id)
    }
}

fn render_messages(batch: &[crate::types::WindowMessage]) -> String {
    batch
        .iter()
        .map(|m| format!("{}: {}", m.role, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip optional markdown fences and extract the outermost `[ ... ]`.
fn extract_json_array(raw: &str) -> Option<String> {
    let text = strip_fences(raw);
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

/// Strip optional markdown fences and extract the outermost `{ ... }`.
fn extract_json_object(raw: &str) -> Option<String> {
    let text = strip_fences(raw);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_lang = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_lang.strip_suffix("```").unwrap_or(without_lang).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_array_strips_fences() {
        let raw = "```json\n[{\"op\":\"add\"}]\n```";
        let extracted = extract_json_array(raw).unwrap();
        assert_eq!(extracted, "[{\"op\":\"add\"}]");
    }

    #[test]
    fn extract_json_object_handles_bare_object() {
        let raw = "{\"bot\": {}}";
        assert_eq!(extract_json_object(raw).unwrap(), raw);
    }

    #[test]
    fn extract_json_array_returns_none_without_brackets() {
        assert!(extract_json_array("no array here").is_none());
    }
}
