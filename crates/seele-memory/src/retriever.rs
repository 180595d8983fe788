use seele_core::{clock, Role};
use seele_llm::EmbeddingClient;
use seele_store::ScoredSummary;
use seele_store::Store;

use crate::error::Result;

/// Formatted, ready-to-inject retrieval output.
#[derive(Debug, Default, Clone)]
pub struct RetrievalResult {
    pub summaries_text: Option<String>,
    pub conversations_text: Option<String>,
}

/// Pulls related long-term memory for the current turn: summaries by vector
/// similarity, then conversations bound to each summary's time range, then
/// optional reranking, then timezone-local formatting.
pub struct Retriever<'a> {
    store: &'a Store,
    embedding: &'a EmbeddingClient,
    reranker: &'a seele_llm::RerankerClient,
    recall_summary_per_query: usize,
    recall_conv_per_summary: usize,
    rerank_top_summaries: usize,
    rerank_top_convs: usize,
    timezone: String,
}

impl<'a> Retriever<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a Store,
        embedding: &'a EmbeddingClient,
        reranker: &'a seele_llm::RerankerClient,
        recall_summary_per_query: usize,
        recall_conv_per_summary: usize,
        rerank_top_summaries: usize,
        rerank_top_convs: usize,
        timezone: String,
    ) -> Self {
        Self {
            store,
            embedding,
            reranker,
            recall_summary_per_query,
            recall_conv_per_summary,
            rerank_top_summaries,
            rerank_top_convs,
            timezone,
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        last_bot_message: Option<&str>,
        query_embedding: Option<Vec<f32>>,
        last_bot_embedding: Option<Vec<f32>>,
        exclude_summary_ids: &[i64],
    ) -> Result<RetrievalResult> {
        let query_embedding = match query_embedding {
            Some(v) => v,
            None => self.embedding.embed(query).await?,
        };

        let mut scored: Vec<ScoredSummary> = self.store.search_summaries(
            &query_embedding,
            self.recall_summary_per_query,
            exclude_summary_ids,
        )?;

        if let Some(last_bot) = last_bot_message {
            let bot_embedding = match last_bot_embedding {
                Some(v) => v,
                None => self.embedding.embed(last_bot).await?,
            };
            let more = self.store.search_summaries(
                &bot_embedding,
                self.recall_summary_per_query,
                exclude_summary_ids,
            )?;
            merge_scored_summaries(&mut scored, more);
        }

        if scored.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let mut conversations_by_summary: Vec<(i64, Vec<seele_store::Conversation>)> =
            Vec::with_capacity(scored.len());
        for s in &scored {
            let convs = self.store.get_conversations_by_time_range(
                s.summary.first_timestamp,
                s.summary.last_timestamp,
                self.recall_conv_per_summary,
            )?;
            conversations_by_summary.push((s.summary.id, convs));
        }

        let summary_texts: Vec<String> = scored.iter().map(|s| s.summary.summary.clone()).collect();
        let all_conversations: Vec<seele_store::Conversation> = conversations_by_summary
            .into_iter()
            .flat_map(|(_, convs)| convs)
            .collect();
        let conversation_texts: Vec<String> =
            all_conversations.iter().map(|c| c.text.clone()).collect();

        let ranked_summaries: Vec<&ScoredSummary> = if self.reranker.is_enabled() {
            let order = self
                .reranker
                .rerank(query, &summary_texts, self.rerank_top_summaries)
                .await;
            order.into_iter().filter_map(|i| scored.get(i)).collect()
        } else {
            scored.iter().take(self.rerank_top_summaries).collect()
        };

        let ranked_conversations: Vec<&seele_store::Conversation> = if self.reranker.is_enabled() {
            let order = self
                .reranker
                .rerank(query, &conversation_texts, self.rerank_top_convs)
                .await;
            order
                .into_iter()
                .filter_map(|i| all_conversations.get(i))
                .collect()
        } else {
            all_conversations.iter().take(self.rerank_top_convs).collect()
        };

        let summaries_text = if ranked_summaries.is_empty() {
            None
        } else {
            Some(
                ranked_summaries
                    .iter()
                    .map(|s| self.format_summary(s))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };

        let conversations_text = if ranked_conversations.is_empty() {
            None
        } else {
            Some(
                ranked_conversations
                    .iter()
                    .map(|c| self.format_conversation(c))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };

        Ok(RetrievalResult {
            summaries_text,
            conversations_text,
        })
    }

    fn format_summary(&self, scored: &ScoredSummary) -> String {
        let start = clock::timestamp_to_str(scored.summary.first_timestamp, &self.timezone);
        let end = clock::timestamp_to_str(scored.summary.last_timestamp, &self.timezone);
        if scored.summary.first_timestamp == scored.summary.last_timestamp {
            format!("[{start}] {}", scored.summary.summary)
        } else {
            format!("[{start} ~ {end}] {}", scored.summary.summary)
        }
    }

    fn format_conversation(&self, conversation: &seele_store::Conversation) -> String {
        let time = clock::timestamp_to_str(conversation.timestamp, &self.timezone);
        let label = match conversation.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        format!("[{time}] {label}: {}", conversation.text)
    }
}

/// Union by summary id, preserving first-seen order.
fn merge_scored_summaries(base: &mut Vec<ScoredSummary>, additional: Vec<ScoredSummary>) {
    let seen: std::collections::HashSet<i64> = base.iter().map(|s| s.summary.id).collect();
    for item in additional {
        if !seen.contains(&item.summary.id) {
            base.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seele_llm::EmbeddingClient as EmbClient;

    #[tokio::test]
    async fn empty_store_yields_no_retrieval() {
        let store = Store::open_in_memory().unwrap();
        let embedding = EmbClient::new(
            "http://127.0.0.1:1".to_string(),
            "key".to_string(),
            "model".to_string(),
            1536,
            std::time::Duration::from_millis(100),
        );
        let reranker =
            seele_llm::RerankerClient::new(None, None, None, std::time::Duration::from_millis(100));
        let retriever = Retriever::new(
            &store,
            &embedding,
            &reranker,
            3,
            4,
            3,
            6,
            "Asia/Shanghai".to_string(),
        );
        // no summaries exist, so embed() is never reached for the query path
        // because search happens after an embedding is supplied directly.
        let result = retriever
            .retrieve("hello", None, Some(vec![1.0, 0.0]), None, &[])
            .await
            .unwrap();
        assert!(result.summaries_text.is_none());
        assert!(result.conversations_text.is_none());
    }
}
