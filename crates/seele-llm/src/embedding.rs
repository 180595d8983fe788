use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

/// Maps text to a fixed-dimension float vector, memoizing by exact text key
/// within the process.
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
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
            model: model.into(),
            dimension,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().unwrap().get(text).cloned() {
            return Ok(cached);
        }
        let vectors = self.request(&[text.to_string()]).await?;
        let vector = vectors.into_iter().next().unwrap_or_default();
        self.cache
            .lock()
            .unwrap()
            .insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    /// Batch variant: only requests cache misses (deduplicated) in one
    /// upstream call, then returns a vector aligned to `texts`' order.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut misses: Vec<String> = Vec::new();
        {
            let cache = self.cache.lock().unwrap();
            for text in texts {
                if !cache.contains_key(text) && !misses.contains(text) {
                    misses.push(text.clone());
                }
            }
        }

        if !misses.is_empty() {
            let fetched = self.request(&misses).await?;
            let mut cache = self.cache.lock().unwrap();
            for (text, vector) in misses.iter().zip(fetched.into_iter()) {
                cache.insert(text.clone(), vector);
            }
        }

        let cache = self.cache.lock().unwrap();
        Ok(texts
            .iter()
            .map(|t| cache.get(t).cloned().unwrap_or_default())
            .collect())
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .await?
            .error_for_status()?;

        let parsed: EmbeddingResponse = resp.json().await?;
        let mut out = vec![Vec::new(); texts.len()];
        for datum in parsed.data {
            if datum.embedding.len() != self.dimension {
                warn!(
                    expected = self.dimension,
                    actual = datum.embedding.len(),
                    "embedding dimension mismatch, storing as-is"
                );
            }
            if let Some(slot) = out.get_mut(datum.index) {
                *slot = datum.embedding;
            }
        }
        Ok(out)
    }
}
