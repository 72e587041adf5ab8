use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionSource {
    /// Produced by the analysis model itself
    Llm,
    /// Produced by the companion assistant from the client's history
    HistoricalAssistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Immediate,
    Reflection,
    Improvement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionTiming {
    Now,
    NextPause,
    EndOfCall,
}

/// One actionable prompt offered to the coach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingSuggestion {
    pub id: String,
    pub kind: SuggestionKind,
    pub priority: SuggestionPriority,
    pub category: String,
    pub text: String,
    pub rationale: String,
    pub timing: SuggestionTiming,
    pub triggered_by: Option<String>,
    pub source: SuggestionSource,
    pub created_at: DateTime<Utc>,
}

/// Where the conversation currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Opening,
    Exploration,
    Insight,
    Commitment,
    Closing,
}

/// Result of one incremental analysis pass.
///
/// Superseded, not merged, by the next pass for the same session.
/// `last_analyzed_index` is the transcript length at the time the pass
/// started and is the starting offset for the next pass's delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingAnalysis {
    pub bot_id: String,
    pub analysis_id: String,
    pub generated_at: DateTime<Utc>,

    /// 1-10 across the whole conversation
    pub overall_score: u8,
    pub criteria_scores: BTreeMap<String, u8>,
    pub value_alignment: BTreeMap<String, u8>,

    pub suggestions: Vec<CoachingSuggestion>,

    pub conversation_phase: ConversationPhase,
    pub phase_reasoning: Option<String>,

    pub coach_energy: u8,
    pub coach_energy_reasoning: Option<String>,
    pub client_engagement: u8,
    pub client_engagement_reasoning: Option<String>,

    pub patterns_detected: Vec<String>,
    pub urgent_moments: Vec<String>,
    pub meta_opportunities: Vec<String>,

    pub last_analyzed_index: usize,
}
