use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::analysis::{AnalysisError, CoachingAnalysis};
use crate::persist::{SaveOutcome, SessionSeed};
use crate::transcript::{BotInfo, BotStatus, TranscriptEntry};

use super::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Inbound event from the transcription provider's webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub bot_id: String,

    #[serde(rename = "type")]
    pub kind: WebhookKind,

    /// Present for status events
    pub status: Option<BotStatus>,

    /// Present for transcript events
    pub entry: Option<TranscriptEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookKind {
    Status,
    Transcript,
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct EnsureSessionRequest {
    pub user_id: String,
    pub meeting_url: String,
    pub client_id: Option<String>,
    pub status: Option<BotStatus>,
    pub platform: Option<String>,
    pub meeting_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnsureSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: CoachingAnalysis,
    pub new_suggestions: usize,
    pub transcript_length: usize,
    pub analyzed_from_index: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(what: &str, bot_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{} not found for bot {}", what, bot_id),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /webhooks/transcript
/// Route a provider event to the session store.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    match event.kind {
        WebhookKind::Status => match event.status {
            Some(status) => {
                state.store.update_status(&event.bot_id, status).await;
            }
            None => {
                warn!(bot_id = %event.bot_id, "status event without a status, ignoring");
            }
        },
        WebhookKind::Transcript => match event.entry {
            Some(entry) => {
                state.store.add_entry(&event.bot_id, entry).await;
            }
            None => {
                warn!(bot_id = %event.bot_id, "transcript event without an entry, ignoring");
            }
        },
        WebhookKind::Other => {
            // Unknown event kinds are acknowledged so the provider does not
            // retry them forever.
            info!(bot_id = %event.bot_id, "ignoring unrecognized webhook event");
        }
    }

    (StatusCode::OK, Json(WebhookResponse { success: true }))
}

/// POST /sessions/:bot_id/ensure
/// Create or resolve the durable session row and refresh bot metadata.
pub async fn ensure_session(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    Json(req): Json<EnsureSessionRequest>,
) -> impl IntoResponse {
    let seed = SessionSeed {
        meeting_url: req.meeting_url.clone(),
        client_id: req.client_id,
        status: req.status,
        metadata: None,
    };

    let session_id = match state
        .adapter
        .ensure_session(&bot_id, Some(req.user_id.as_str()), Some(&seed))
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(%bot_id, error = %e, "failed to ensure session");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    state
        .store
        .init_session(
            &bot_id,
            BotInfo {
                id: bot_id.clone(),
                status: req.status.unwrap_or(BotStatus::Created),
                meeting_url: req.meeting_url,
                platform: req.platform,
                meeting_id: req.meeting_id,
            },
        )
        .await;

    (StatusCode::OK, Json(EnsureSessionResponse { session_id })).into_response()
}

/// GET /sessions
/// List projections of all live sessions (debug surface).
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.store.get_all_sessions_info().await;
    (StatusCode::OK, Json(sessions))
}

/// GET /sessions/:bot_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_session_info(&bot_id).await {
        Some(info) => (StatusCode::OK, Json(info)).into_response(),
        None => not_found("session", &bot_id),
    }
}

/// GET /sessions/:bot_id/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_transcript(&bot_id).await {
        Some(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
        None => not_found("session", &bot_id),
    }
}

/// POST /sessions/:bot_id/save
/// Flush unsaved entries now (e.g. on session end).
pub async fn force_save(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> impl IntoResponse {
    let outcome = state.coordinator.force_save_session(&bot_id).await;
    let status = if outcome.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(outcome))
}

/// GET /sessions/:bot_id/save-status
pub async fn get_save_status(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> impl IntoResponse {
    match state.coordinator.get_save_status(&bot_id).await {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => not_found("session", &bot_id),
    }
}

/// POST /sessions/:bot_id/analyze
/// Run an incremental analysis pass over new content.
pub async fn run_analysis(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = state.store.get_session(&bot_id).await else {
        return not_found("session", &bot_id);
    };

    let last_analyzed = state
        .engine
        .get_latest_analysis(&bot_id)
        .await
        .map(|a| a.last_analyzed_index)
        .unwrap_or(0);

    // Nothing new since the last pass: return the existing analysis rather
    // than burning a model call.
    if session.transcript.len() <= last_analyzed {
        return match state.engine.get_latest_analysis(&bot_id).await {
            Some(analysis) => (
                StatusCode::OK,
                Json(AnalyzeResponse {
                    new_suggestions: 0,
                    transcript_length: session.transcript.len(),
                    analyzed_from_index: last_analyzed,
                    analysis,
                }),
            )
                .into_response(),
            None => (
                StatusCode::OK,
                Json(ErrorResponse {
                    error: "no content to analyze".to_string(),
                }),
            )
                .into_response(),
        };
    }

    // The linked client (if any) lives on the durable session row.
    let client_id = match state.adapter.lookup_session(&bot_id, None).await {
        Ok(record) => record.and_then(|r| r.client_id),
        Err(e) => {
            warn!(%bot_id, error = %e, "client lookup failed, analyzing without history");
            None
        }
    };

    match state
        .engine
        .analyze(
            &bot_id,
            &session.transcript,
            client_id.as_deref(),
            last_analyzed,
        )
        .await
    {
        Ok(analysis) => (
            StatusCode::OK,
            Json(AnalyzeResponse {
                new_suggestions: analysis.suggestions.len(),
                transcript_length: session.transcript.len(),
                analyzed_from_index: last_analyzed,
                analysis,
            }),
        )
            .into_response(),
        Err(AnalysisError::AlreadyRunning(_)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "analysis already running".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(%bot_id, error = %e, "analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /sessions/:bot_id/analysis
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> impl IntoResponse {
    match state.engine.get_latest_analysis(&bot_id).await {
        Some(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        None => not_found("analysis", &bot_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
