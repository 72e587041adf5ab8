//! Chat-completion boundary
//!
//! The analysis engine only needs `complete(system, prompt) -> text`; the
//! OpenAI-compatible implementation lives in `openai`.

mod openai;

use async_trait::async_trait;

pub use openai::{OpenAiChatClient, OpenAiChatConfig};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no content in chat completion response")]
    NoContent,
}

/// Minimal chat-completion contract.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}
