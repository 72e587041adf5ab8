use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::BotStatus;

/// Projection of a live session for monitoring/debug surfaces.
///
/// Deliberately excludes the transcript itself so listing endpoints stay
/// cheap even for long calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub bot_id: String,
    pub status: BotStatus,
    pub meeting_url: String,
    pub platform: Option<String>,
    pub meeting_id: Option<String>,
    pub transcript_count: usize,
    pub webhook_events: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Batch-save bookkeeping for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveStatus {
    /// Whether a flush is currently in flight
    pub in_progress: bool,

    /// Local view of the durable high-water mark
    pub saved_count: usize,

    /// Entries beyond the high-water mark, not yet durable
    pub unsaved_count: usize,

    pub last_save_at: Option<DateTime<Utc>>,
}
