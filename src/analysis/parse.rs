use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::criteria::{MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE};
use super::types::{
    CoachingAnalysis, CoachingSuggestion, ConversationPhase, SuggestionKind, SuggestionPriority,
    SuggestionSource, SuggestionTiming,
};

/// Why a model response could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON object found in analysis response")]
    NoJsonObject,

    #[error("malformed analysis JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structured fields as the model produced them, before normalization.
/// Every field is optional; normalization decides defaults, not parsing.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnalysis {
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub criteria_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub value_alignment: BTreeMap<String, f64>,
    #[serde(default)]
    pub suggestions: Vec<RawSuggestion>,
    pub conversation_phase: Option<String>,
    pub phase_reasoning: Option<String>,
    pub coach_energy: Option<f64>,
    pub coach_energy_reasoning: Option<String>,
    pub client_engagement: Option<f64>,
    pub client_engagement_reasoning: Option<String>,
    #[serde(default)]
    pub patterns_detected: Vec<String>,
    #[serde(default)]
    pub urgent_moments: Vec<String>,
    #[serde(default)]
    pub meta_opportunities: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSuggestion {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub suggestion: Option<String>,
    pub rationale: Option<String>,
    pub timing: Option<String>,
    pub triggered_by: Option<String>,
}

/// Locate the JSON object embedded in free-form model output.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

/// Parse the model response into tagged raw fields.
///
/// Parsing only decides well-formed vs malformed; defaulting of missing
/// numerics happens in the explicit normalization step below.
pub fn parse_analysis(content: &str) -> Result<RawAnalysis, ParseError> {
    let json = extract_json_object(content).ok_or(ParseError::NoJsonObject)?;
    Ok(serde_json::from_str(json)?)
}

/// Clamp a model-reported score to 1-10; absent or non-finite values fall
/// back to the neutral midpoint.
pub fn normalize_score(value: Option<f64>) -> u8 {
    match value {
        Some(v) if v.is_finite() => (v.round() as i64).clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8,
        _ => NEUTRAL_SCORE,
    }
}

fn normalize_scores(raw: BTreeMap<String, f64>) -> BTreeMap<String, u8> {
    raw.into_iter()
        .map(|(key, value)| (key, normalize_score(Some(value))))
        .collect()
}

fn parse_phase(raw: Option<&str>) -> ConversationPhase {
    match raw.map(str::trim) {
        Some("opening") => ConversationPhase::Opening,
        Some("insight") => ConversationPhase::Insight,
        Some("commitment") => ConversationPhase::Commitment,
        Some("closing") => ConversationPhase::Closing,
        _ => ConversationPhase::Exploration,
    }
}

fn parse_kind(raw: Option<&str>) -> SuggestionKind {
    match raw {
        Some("reflection") => SuggestionKind::Reflection,
        Some("improvement") => SuggestionKind::Improvement,
        _ => SuggestionKind::Immediate,
    }
}

fn parse_priority(raw: Option<&str>) -> SuggestionPriority {
    match raw {
        Some("high") => SuggestionPriority::High,
        Some("low") => SuggestionPriority::Low,
        _ => SuggestionPriority::Medium,
    }
}

fn parse_timing(raw: Option<&str>) -> SuggestionTiming {
    match raw {
        Some("next_pause") => SuggestionTiming::NextPause,
        Some("end_of_call") => SuggestionTiming::EndOfCall,
        _ => SuggestionTiming::Now,
    }
}

impl RawAnalysis {
    /// Normalize into a complete analysis record.
    ///
    /// `last_analyzed_index` must be the transcript length captured when the
    /// pass started, so the next pass's delta is exactly what arrived after
    /// this call.
    pub fn into_analysis(self, bot_id: &str, last_analyzed_index: usize) -> CoachingAnalysis {
        let now = Utc::now();

        let suggestions = self
            .suggestions
            .into_iter()
            .filter_map(|raw| {
                // A suggestion without text is unusable; everything else
                // gets defaults.
                let text = raw.suggestion?;
                Some(CoachingSuggestion {
                    id: format!("{}-{}", bot_id, Uuid::new_v4()),
                    kind: parse_kind(raw.kind.as_deref()),
                    priority: parse_priority(raw.priority.as_deref()),
                    category: raw.category.unwrap_or_else(|| "general".to_string()),
                    text,
                    rationale: raw.rationale.unwrap_or_default(),
                    timing: parse_timing(raw.timing.as_deref()),
                    triggered_by: raw.triggered_by,
                    source: SuggestionSource::Llm,
                    created_at: now,
                })
            })
            .collect();

        CoachingAnalysis {
            bot_id: bot_id.to_string(),
            analysis_id: format!("analysis-{}-{}", bot_id, Uuid::new_v4()),
            generated_at: now,
            overall_score: normalize_score(self.overall_score),
            criteria_scores: normalize_scores(self.criteria_scores),
            value_alignment: normalize_scores(self.value_alignment),
            suggestions,
            conversation_phase: parse_phase(self.conversation_phase.as_deref()),
            phase_reasoning: self.phase_reasoning,
            coach_energy: normalize_score(self.coach_energy),
            coach_energy_reasoning: self.coach_energy_reasoning,
            client_engagement: normalize_score(self.client_engagement),
            client_engagement_reasoning: self.client_engagement_reasoning,
            patterns_detected: self.patterns_detected,
            urgent_moments: self.urgent_moments,
            meta_opportunities: self.meta_opportunities,
            last_analyzed_index,
        }
    }
}
