//! `seele-llm` — embedding, reranking, and dual-role LLM client with prompt
//! composition and tool-call loop.

pub mod client;
pub mod embedding;
pub mod error;
pub mod prompts;
pub mod reranker;
pub mod types;
mod wire;

pub use client::{LlmClient, ToolExecutor};
pub use embedding::EmbeddingClient;
pub use error::{LlmError, Result};
pub use reranker::RerankerClient;
pub use types::{ChatMessage, ToolCall, ToolDefinition, ToolResult, WireRole};
