use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
    index: usize,
    #[serde(default)]
    relevance_score: f32,
}

/// Optional cross-encoder reranker. Disabled unless `api_key`, `base_url`,
/// and `model` are all configured — in which case `rerank` behaves as a
/// no-op "take first `top_n`" passthrough.
pub struct RerankerClient {
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl RerankerClient {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some() && self.model.is_some()
    }

    /// Reorder `documents` by relevance to `query`, truncated to `top_n`.
    /// Returns the indices of `documents` in ranked order. On API error or
    /// when disabled, falls back to input order truncated to `top_n`.
    pub async fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Vec<usize> {
        let passthrough = || (0..documents.len()).take(top_n).collect::<Vec<_>>();

        if !self.is_enabled() {
            return passthrough();
        }

        match self.call(query, documents, top_n).await {
            Ok(indices) => indices,
            Err(e) => {
                warn!("reranker call failed, falling back to input order: {e}");
                passthrough()
            }
        }
    }

    async fn call(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<usize>, reqwest::Error> {
        let base_url = self.base_url.as_deref().unwrap_or_default();
        let url = format!("{}/rerank", base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.as_deref().unwrap_or_default())
            .json(&serde_json::json!({
                "model": self.model,
                "query": query,
                "documents": documents,
                "top_n": top_n,
            }))
            .send()
            .await?
            .error_for_status()?;

        let mut results = resp.json::<RerankResponse>().await?.results;
        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(results.into_iter().take(top_n).map(|r| r.index).collect())
    }
}
