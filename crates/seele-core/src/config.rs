use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration (`<profile>.toml` + `SEELE_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeeleConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for SeeleConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            rerank: RerankConfig::default(),
            memory: MemoryConfig::default(),
            session: SessionConfig::default(),
            timezone: default_timezone(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_tool_model")]
    pub tool_model: String,
    #[serde(default = "default_chat_effort")]
    pub chat_reasoning_effort: String,
    #[serde(default = "default_tool_effort")]
    pub tool_reasoning_effort: String,
    /// Per-call HTTP timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base(),
            chat_model: default_chat_model(),
            tool_model: default_tool_model(),
            chat_reasoning_effort: default_chat_effort(),
            tool_reasoning_effort: default_tool_effort(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

/// Reranker is disabled unless all three of api_key/model/base_url are set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RerankConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl RerankConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|s| !s.is_empty())
            && self.base_url.as_deref().is_some_and(|s| !s.is_empty())
            && self.model.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_keep_min")]
    pub context_window_keep_min: usize,
    #[serde(default = "default_trigger_summary")]
    pub context_window_trigger_summary: usize,
    #[serde(default = "default_recent_summaries_max")]
    pub recent_summaries_max: usize,
    #[serde(default = "default_recall_summary_per_query")]
    pub recall_summary_per_query: usize,
    #[serde(default = "default_recall_conv_per_summary")]
    pub recall_conv_per_summary: usize,
    #[serde(default = "default_rerank_top_summaries")]
    pub rerank_top_summaries: usize,
    #[serde(default = "default_rerank_top_convs")]
    pub rerank_top_convs: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            context_window_keep_min: default_keep_min(),
            context_window_trigger_summary: default_trigger_summary(),
            recent_summaries_max: default_recent_summaries_max(),
            recall_summary_per_query: default_recall_summary_per_query(),
            recall_conv_per_summary: default_recall_conv_per_summary(),
            rerank_top_summaries: default_rerank_top_summaries(),
            rerank_top_convs: default_rerank_top_convs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_new_session_command")]
    pub new_session_command: String,
    #[serde(default = "default_reset_session_command")]
    pub reset_session_command: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            new_session_command: default_new_session_command(),
            reset_session_command: default_reset_session_command(),
        }
    }
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}
fn default_data_dir() -> String {
    "data/default".to_string()
}
fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o".to_string()
}
fn default_tool_model() -> String {
    "gpt-4o".to_string()
}
fn default_chat_effort() -> String {
    "low".to_string()
}
fn default_tool_effort() -> String {
    "medium".to_string()
}
fn default_timeout_ms() -> u64 {
    60_000
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_dimension() -> usize {
    1536
}
fn default_keep_min() -> usize {
    12
}
fn default_trigger_summary() -> usize {
    24
}
fn default_recent_summaries_max() -> usize {
    3
}
fn default_recall_summary_per_query() -> usize {
    3
}
fn default_recall_conv_per_summary() -> usize {
    4
}
fn default_rerank_top_summaries() -> usize {
    3
}
fn default_rerank_top_convs() -> usize {
    6
}
fn default_new_session_command() -> String {
    "/new".to_string()
}
fn default_reset_session_command() -> String {
    "/reset".to_string()
}

impl SeeleConfig {
    /// Load config from a TOML file with `SEELE_*` env var overrides.
    pub fn load(config_path: &str) -> crate::error::Result<Self> {
        let config: SeeleConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SEELE_").split("_"))
            .extract()
            .map_err(|e| crate::error::SeeleError::Config(e.to_string()))?;
        Ok(config)
    }
}
