//! Companion-assistant boundary
//!
//! One external assistant service provides both optional enrichments for an
//! analysis pass: a prior-session summary for the linked client, and
//! supplementary suggestions drawn from the client's history. Both degrade
//! gracefully; the engine proceeds without them on any failure.

mod client;

use async_trait::async_trait;

use crate::analysis::CoachingSuggestion;

pub use client::{CompanionClient, CompanionConfig};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("assistant returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl AssistantError {
    /// Client-side errors are permanent; everything else is worth a retry.
    pub fn is_transient(&self) -> bool {
        match self {
            AssistantError::Status { status, .. } => !(400..500).contains(status),
            AssistantError::Request(_) => true,
        }
    }
}

#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Prior-session summary for a client. `Ok(None)` means no history,
    /// a normal empty result, never an error.
    async fn client_context(&self, client_id: &str) -> Result<Option<String>, AssistantError>;

    /// Supplementary suggestions from the client's history, given the same
    /// recent/full conversation slices as the main analysis.
    async fn supplementary_suggestions(
        &self,
        recent: &str,
        full: &str,
    ) -> Result<Vec<CoachingSuggestion>, AssistantError>;
}
