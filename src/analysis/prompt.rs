use std::fmt::Write;

use crate::transcript::TranscriptEntry;

use super::criteria::{COACHING_CRITERIA, CORE_VALUES, SUGGESTION_CATEGORIES};
use super::types::CoachingAnalysis;

pub const SYSTEM_PROMPT: &str = "You are an expert coaching sidekick that augments a \
coach's intuition, presence, and performance by analyzing live coaching conversations. \
You offer timely, context-aware options to deepen impact, provoke vision, expand \
ownership, and unlock stuck moments. You are the brush, not the painter: always offer \
options, never commands.";

/// Everything one analysis pass feeds the model.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// The whole conversation so far
    pub full: &'a str,

    /// Only what arrived since the last analyzed index
    pub recent: &'a str,

    /// The superseded analysis, for cross-pass continuity
    pub previous: Option<&'a CoachingAnalysis>,

    /// Prior-session summary for the linked client, if any
    pub history: Option<&'a str>,
}

/// Render transcript entries as `speaker: text` lines.
pub fn render_conversation(entries: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{}: {}", entry.speaker, entry.text);
    }
    out
}

/// Assemble the bounded analysis prompt: fixed criteria, full conversation,
/// recent delta, previous-pass summary, and historical context when present.
pub fn build_analysis_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str("REAL-TIME COACHING CONVERSATION ANALYSIS\n\n");

    prompt.push_str("CORE VALUES FILTER (all analysis and suggestions pass through):\n");
    for (key, description) in CORE_VALUES {
        let _ = writeln!(prompt, "- {}: {}", key, description);
    }

    prompt.push_str("\nCOACHING CRITERIA TO EVALUATE (score each 1-10):\n");
    for (key, description) in COACHING_CRITERIA {
        let _ = writeln!(prompt, "- {}: {}", key, description);
    }

    prompt.push_str("\nSUGGESTION CATEGORIES:\n");
    for (key, description) in SUGGESTION_CATEGORIES {
        let _ = writeln!(prompt, "- {}: {}", key, description);
    }

    let _ = write!(
        prompt,
        "\nFULL CONVERSATION SO FAR:\n{}\n\nRECENT NEW CONVERSATION SINCE LAST ANALYSIS:\n{}\n",
        ctx.full, ctx.recent
    );

    if let Some(previous) = ctx.previous {
        let _ = write!(
            prompt,
            "\nPREVIOUS ANALYSIS CONTEXT:\n\
             - Overall score: {}/10\n\
             - Conversation phase: {:?}\n\
             - Coach energy: {}/10\n\
             - Client engagement: {}/10\n\
             - Previous suggestions: {}\n",
            previous.overall_score,
            previous.conversation_phase,
            previous.coach_energy,
            previous.client_engagement,
            previous.suggestions.len(),
        );
    }

    if let Some(history) = ctx.history {
        let _ = write!(
            prompt,
            "\nCLIENT HISTORY FROM PREVIOUS SESSIONS:\n{}\n",
            history
        );
    }

    prompt.push_str(
        "\nREQUIREMENTS:\n\
         1. Generate 1-4 immediately usable suggestions targeting specific \
         opportunities or stuck moments, each with category, rationale, priority, \
         and timing (now / next_pause / end_of_call).\n\
         2. Score every coaching criterion 1-10 based on the full conversation.\n\
         3. Score alignment with each core value 1-10.\n\
         4. Identify the conversation phase (opening / exploration / insight / \
         commitment / closing) with reasoning.\n\
         5. Rate coach energy and client engagement 1-10 with brief rationale.\n\
         6. Note detected patterns, urgent moments, and meta opportunities.\n\
         Only suggest when there is meaningful opportunity; if the recent \
         conversation lacks substance, focus on scoring.\n",
    );

    prompt.push_str(
        "\nRespond with a single JSON object:\n\
         {\n\
           \"overall_score\": 7,\n\
           \"criteria_scores\": {\"clear_vision\": 6, \"...\": 0},\n\
           \"value_alignment\": {\"growth\": 7, \"...\": 0},\n\
           \"suggestions\": [\n\
             {\"type\": \"immediate\", \"priority\": \"high\", \"category\": \"interrupt_loop\",\n\
              \"suggestion\": \"...\", \"rationale\": \"...\", \"timing\": \"now\",\n\
              \"triggered_by\": \"...\"}\n\
           ],\n\
           \"conversation_phase\": \"exploration\",\n\
           \"phase_reasoning\": \"...\",\n\
           \"coach_energy\": 7,\n\
           \"coach_energy_reasoning\": \"...\",\n\
           \"client_engagement\": 6,\n\
           \"client_engagement_reasoning\": \"...\",\n\
           \"patterns_detected\": [\"...\"],\n\
           \"urgent_moments\": [],\n\
           \"meta_opportunities\": [\"...\"]\n\
         }\n",
    );

    prompt
}
