use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single speech segment received from the transcription provider.
///
/// Non-final entries are live-caption refinements and may be replaced in
/// place by the store; a final entry is immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub text: String,

    /// When the segment was produced
    pub timestamp: DateTime<Utc>,

    /// Confidence score (0.0 to 1.0), if the provider reports one
    #[serde(default)]
    pub confidence: Option<f32>,

    /// Whether the provider will revise this segment further
    pub is_final: bool,

    /// Offset from call start, in seconds
    #[serde(default)]
    pub start_time: Option<f64>,

    #[serde(default)]
    pub end_time: Option<f64>,
}

/// Lifecycle states reported by the meeting bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Created,
    Joining,
    InCall,
    Recording,
    Ended,
    /// Placeholder for sessions created implicitly by a transcript event
    /// arriving before any init call.
    Unknown,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Created => "created",
            BotStatus::Joining => "joining",
            BotStatus::InCall => "in_call",
            BotStatus::Recording => "recording",
            BotStatus::Ended => "ended",
            BotStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about the bot attached to one live call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInfo {
    /// External bot/call identifier
    pub id: String,

    pub status: BotStatus,

    pub meeting_url: String,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub meeting_id: Option<String>,
}

impl BotInfo {
    /// Placeholder metadata for a session the store has to create on the fly
    /// because a transcript event outran the init call.
    pub fn placeholder(bot_id: &str) -> Self {
        Self {
            id: bot_id.to_string(),
            status: BotStatus::Unknown,
            meeting_url: "#".to_string(),
            platform: None,
            meeting_id: None,
        }
    }
}
