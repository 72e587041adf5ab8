use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::assistant::AssistantService;
use crate::llm::{ChatCompleter, LlmError};
use crate::transcript::TranscriptEntry;

use super::parse::{parse_analysis, ParseError};
use super::prompt::{build_analysis_prompt, render_conversation, PromptContext, SYSTEM_PROMPT};
use super::types::CoachingAnalysis;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Benign skip: a pass for this session is already in flight
    #[error("analysis already running for bot {0}")]
    AlreadyRunning(String),

    #[error("no analysis content received from model")]
    EmptyResponse,

    #[error(transparent)]
    Malformed(#[from] ParseError),

    #[error("chat completion failed: {0}")]
    Llm(#[from] LlmError),
}

/// Produces structured coaching analyses incrementally: each pass analyzes
/// only the transcript slice beyond the previous pass's watermark, blended
/// with full-conversation context and optional client history.
///
/// Analysis state per session only moves forward: `last_analyzed_index` is
/// non-decreasing, and each pass's index becomes the next pass's slice
/// start. Results supersede (never merge with) the previous one.
#[derive(Clone)]
pub struct AnalysisEngine {
    llm: Arc<dyn ChatCompleter>,
    assistant: Option<Arc<dyn AssistantService>>,
    analyses: Arc<RwLock<HashMap<String, CoachingAnalysis>>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl AnalysisEngine {
    pub fn new(llm: Arc<dyn ChatCompleter>, assistant: Option<Arc<dyn AssistantService>>) -> Self {
        Self {
            llm,
            assistant,
            analyses: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Run one incremental pass over `transcript`.
    ///
    /// `last_analyzed_index` is the previous pass's watermark (0 for the
    /// first pass). Concurrent passes for one session would race on the
    /// watermark, so a second caller gets `AlreadyRunning`.
    pub async fn analyze(
        &self,
        bot_id: &str,
        transcript: &[TranscriptEntry],
        client_id: Option<&str>,
        last_analyzed_index: usize,
    ) -> Result<CoachingAnalysis, AnalysisError> {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(bot_id.to_string()) {
                return Err(AnalysisError::AlreadyRunning(bot_id.to_string()));
            }
        }

        let result = self
            .run_pass(bot_id, transcript, client_id, last_analyzed_index)
            .await;

        self.in_flight.lock().await.remove(bot_id);
        result
    }

    async fn run_pass(
        &self,
        bot_id: &str,
        transcript: &[TranscriptEntry],
        client_id: Option<&str>,
        last_analyzed_index: usize,
    ) -> Result<CoachingAnalysis, AnalysisError> {
        // Captured before any await: the next pass's delta is exactly what
        // arrives after this call started, even if more content lands
        // mid-pass.
        let analyzed_len = transcript.len();
        let start = last_analyzed_index.min(analyzed_len);

        let full = render_conversation(transcript);
        let recent = render_conversation(&transcript[start..]);

        let previous = self.analyses.read().await.get(bot_id).cloned();

        // Optional enrichment; analysis never blocks on it.
        let history = match (client_id, self.assistant.as_ref()) {
            (Some(client_id), Some(assistant)) => {
                match assistant.client_context(client_id).await {
                    Ok(context) => context,
                    Err(error) => {
                        warn!(bot_id, client_id, %error, "historical context lookup failed");
                        None
                    }
                }
            }
            _ => None,
        };

        let prompt = build_analysis_prompt(&PromptContext {
            full: &full,
            recent: &recent,
            previous: previous.as_ref(),
            history: history.as_deref(),
        });

        // The secondary suggestion source works the same slices; its failure
        // degrades to an empty list rather than failing the pass.
        let assistant = self.assistant.clone();
        let extra_suggestions = async {
            match assistant {
                Some(assistant) => match assistant
                    .supplementary_suggestions(&recent, &full)
                    .await
                {
                    Ok(suggestions) => suggestions,
                    Err(error) => {
                        warn!(bot_id, %error, "assistant suggestions unavailable");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            }
        };

        let (content, extra) =
            tokio::join!(self.llm.complete(SYSTEM_PROMPT, &prompt), extra_suggestions);

        let content = content?;
        if content.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        let raw = parse_analysis(&content)?;
        let mut analysis = raw.into_analysis(bot_id, analyzed_len);
        analysis.suggestions.extend(extra);

        // Watermark never moves backward, even for a racing caller that read
        // a stale index.
        if let Some(previous) = &previous {
            analysis.last_analyzed_index = analysis
                .last_analyzed_index
                .max(previous.last_analyzed_index);
        }

        info!(
            bot_id,
            suggestions = analysis.suggestions.len(),
            analyzed_to = analysis.last_analyzed_index,
            "analysis pass complete"
        );

        self.analyses
            .write()
            .await
            .insert(bot_id.to_string(), analysis.clone());

        Ok(analysis)
    }

    pub async fn get_latest_analysis(&self, bot_id: &str) -> Option<CoachingAnalysis> {
        self.analyses.read().await.get(bot_id).cloned()
    }

    pub async fn get_all_analyses(&self) -> Vec<CoachingAnalysis> {
        self.analyses.read().await.values().cloned().collect()
    }

    pub async fn clear_analysis(&self, bot_id: &str) {
        self.analyses.write().await.remove(bot_id);
    }

    /// Evict analyses older than the age cutoff; returns the number removed.
    pub async fn cleanup(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut analyses = self.analyses.write().await;
        let before = analyses.len();
        analyses.retain(|_, analysis| analysis.generated_at >= cutoff);
        before - analyses.len()
    }
}
