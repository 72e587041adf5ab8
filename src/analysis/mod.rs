//! Incremental coaching analysis
//!
//! Each pass slices the transcript from the last analyzed index, builds a
//! bounded prompt over both the delta and the full conversation, invokes the
//! chat model, parses a structured result, and advances the per-session
//! watermark. Historical context and supplementary suggestions are optional
//! enrichments that degrade gracefully.

mod criteria;
mod engine;
mod parse;
mod prompt;
mod types;

pub use criteria::{COACHING_CRITERIA, CORE_VALUES, MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE, SUGGESTION_CATEGORIES};
pub use engine::{AnalysisEngine, AnalysisError};
pub use parse::{normalize_score, parse_analysis, ParseError, RawAnalysis, RawSuggestion};
pub use prompt::{build_analysis_prompt, render_conversation, PromptContext, SYSTEM_PROMPT};
pub use types::{
    CoachingAnalysis, CoachingSuggestion, ConversationPhase, SuggestionKind, SuggestionPriority,
    SuggestionSource, SuggestionTiming,
};
