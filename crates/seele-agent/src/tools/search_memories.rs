//! `search_memories` tool — keyword (FTS5) search over past summaries and
//! conversations, with optional role/time filters. The current session is
//! always excluded so the model can't "recall" the turn it's in.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use serde_json::{json, Value};

use seele_core::{clock, Role};
use seele_llm::ToolResult;
use seele_memory::MemoryManager;
use seele_store::{Store, TimeRange};

use super::Tool;

const VALID_QUERY_EXAMPLES: &str = "Valid examples:\n\
- Anna AND movies\n\
- movies OR music\n\
- \"exact phrase\"\n\
- (movies OR music) AND Anna";

pub struct SearchMemoriesTool {
    store: Arc<Store>,
    memory: Arc<MemoryManager>,
    timezone: String,
    limit: usize,
}

impl SearchMemoriesTool {
    pub fn new(store: Arc<Store>, memory: Arc<MemoryManager>, timezone: String, limit: usize) -> Self {
        Self {
            store,
            memory,
            timezone,
            limit,
        }
    }

    fn parse_role(input: &Value) -> Result<Option<Role>, String> {
        match input.get("role").and_then(Value::as_str) {
            None => Ok(None),
            Some("user") => Ok(Some(Role::User)),
            Some("assistant") => Ok(Some(Role::Assistant)),
            Some(other) => Err(format!("invalid role '{other}', expected user or assistant")),
        }
    }

    fn time_range(&self, input: &Value) -> Result<TimeRange, String> {
        let now = clock::now_secs();
        let mut range = TimeRange::default();

        if let Some(period) = input.get("time_period").and_then(Value::as_str) {
            let back_secs = match period {
                "last_day" => 86_400,
                "last_week" => 7 * 86_400,
                "last_month" => 30 * 86_400,
                "last_year" => 365 * 86_400,
                other => return Err(format!("invalid time_period '{other}'")),
            };
            range.start = Some(now - back_secs);
        }

        if let Some(start_date) = input.get("start_date").and_then(Value::as_str) {
            range.start = Some(self.parse_local_date(start_date, false)?);
        }
        if let Some(end_date) = input.get("end_date").and_then(Value::as_str) {
            range.end = Some(self.parse_local_date(end_date, true)?);
        }

        Ok(range)
    }

    fn parse_local_date(&self, text: &str, end_of_day: bool) -> Result<i64, String> {
        let tz: chrono_tz::Tz = self.timezone.parse().unwrap_or(chrono_tz::Asia::Shanghai);

        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return tz
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.timestamp())
                .ok_or_else(|| format!("ambiguous local datetime: {text}"));
        }

        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            let time = if end_of_day {
                date.and_hms_opt(23, 59, 59).unwrap()
            } else {
                date.and_hms_opt(0, 0, 0).unwrap()
            };
            return tz
                .from_local_datetime(&time)
                .single()
                .map(|dt| dt.timestamp())
                .ok_or_else(|| format!("ambiguous local date: {text}"));
        }

        Err(format!("invalid date '{text}', use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"))
    }
}

#[async_trait]
impl Tool for SearchMemoriesTool {
    fn name(&self) -> &str {
        "search_memories"
    }

    fn description(&self) -> &str {
        "Search through conversation history and summaries using FTS5 keywords and \
optional filters (role, time range). At least one of query, role, or a time \
filter must be given."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "FTS5 keywords: AND/OR/NOT, \"exact phrase\", parens."},
                "role": {"type": "string", "enum": ["user", "assistant"]},
                "time_period": {"type": "string", "enum": ["last_day", "last_week", "last_month", "last_year"]},
                "start_date": {"type": "string", "description": "YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"},
                "end_date": {"type": "string", "description": "YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"},
            },
            "required": [],
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        let query = input.get("query").and_then(Value::as_str).filter(|s| !s.is_empty());
        let role = match Self::parse_role(&input) {
            Ok(r) => r,
            Err(e) => return ToolResult::error(e),
        };
        let range = match self.time_range(&input) {
            Ok(r) => r,
            Err(e) => return ToolResult::error(e),
        };

        if query.is_none() && role.is_none() && range.start.is_none() && range.end.is_none() {
            return ToolResult::error(
                "provide at least one of query, role, time_period, start_date, or end_date",
            );
        }

        let current_session_id = self.memory.session_id();
        let summary_limit = (self.limit / 2).max(1);
        let summaries = match self.store.search_summaries_by_keyword(
            query,
            summary_limit,
            Some(current_session_id),
            range,
        ) {
            Ok(s) => s,
            Err(e) => return ToolResult::error(format!("{e}\n\n{VALID_QUERY_EXAMPLES}")),
        };

        let conversations = match self.store.search_conversations_by_keyword(
            query,
            summary_limit,
            Some(current_session_id),
            role,
            range,
        ) {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("{e}\n\n{VALID_QUERY_EXAMPLES}")),
        };

        if summaries.is_empty() && conversations.is_empty() {
            return ToolResult::success("No memories found matching the search criteria.");
        }

        let mut out = String::new();
        if !summaries.is_empty() {
            out.push_str("== Related Summaries ==\n");
            for s in &summaries {
                let time_str = clock::timestamp_to_str(s.last_timestamp, &self.timezone);
                out.push_str(&format!("[{time_str}] {}\n", s.summary));
            }
        }
        if !conversations.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("== Related Conversations ==\n");
            for c in &conversations {
                let time_str = clock::timestamp_to_str(c.timestamp, &self.timezone);
                let role_label = c.role.label();
                out.push_str(&format!("[{time_str}] {role_label}: {}\n", c.text));
            }
        }

        ToolResult::success(out.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use seele_core::SeeleConfig;
    use seele_llm::{EmbeddingClient, LlmClient, RerankerClient};
    use seele_profile::ProfileStore;

    use super::*;

    /// A `MemoryManager` with a live session (id 1 on a fresh in-memory
    /// store) but no reachable LLM endpoint — fine, since these tests never
    /// trigger a summarization or profile-update call.
    async fn test_memory(store: Arc<Store>, profile_path: &std::path::Path) -> Arc<MemoryManager> {
        let config = SeeleConfig::default();
        let llm = LlmClient::new("http://127.0.0.1:0", "test", "test", "test", "low", "low", Duration::from_millis(1));
        let embedding = EmbeddingClient::new("http://127.0.0.1:0", "test", "test", 8, Duration::from_millis(1));
        let reranker = RerankerClient::new(None, None, None, Duration::from_millis(1));
        let memory = MemoryManager::new(&config, store, ProfileStore::new(profile_path), llm, embedding, reranker);
        memory.restore_or_start_session().await.unwrap();
        Arc::new(memory)
    }

    #[tokio::test]
    async fn rejects_criteria_free_call() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let memory = test_memory(store.clone(), &dir.path().join("profile.json")).await;
        let tool = SearchMemoriesTool::new(store, memory, "UTC".to_string(), 10);
        let result = tool.execute(json!({})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn no_matches_reports_clean_message() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let memory = test_memory(store.clone(), &dir.path().join("profile.json")).await;
        let tool = SearchMemoriesTool::new(store, memory, "UTC".to_string(), 10);
        let result = tool.execute(json!({"query": "nonexistent"})).await;
        assert!(!result.is_error);
        assert!(result.content.contains("No memories found"));
    }

    #[tokio::test]
    async fn excludes_current_session() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let memory = test_memory(store.clone(), &dir.path().join("profile.json")).await;
        store
            .insert_conversation(memory.session_id(), 100, Role::User, "about Anna and movies", None)
            .unwrap();
        let tool = SearchMemoriesTool::new(store, memory, "UTC".to_string(), 10);
        let result = tool.execute(json!({"query": "Anna"})).await;
        assert!(result.content.contains("No memories found"));
    }

    #[tokio::test]
    async fn rejects_bad_role() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let memory = test_memory(store.clone(), &dir.path().join("profile.json")).await;
        let tool = SearchMemoriesTool::new(store, memory, "UTC".to_string(), 10);
        let result = tool.execute(json!({"role": "admin"})).await;
        assert!(result.is_error);
    }
}
