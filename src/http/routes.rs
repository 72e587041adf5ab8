use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Transcription provider webhook
        .route("/webhooks/transcript", post(handlers::receive_webhook))
        // Session queries
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:bot_id", get(handlers::get_session))
        .route(
            "/sessions/:bot_id/transcript",
            get(handlers::get_transcript),
        )
        // Durable session resolution
        .route("/sessions/:bot_id/ensure", post(handlers::ensure_session))
        // Batch saves
        .route("/sessions/:bot_id/save", post(handlers::force_save))
        .route(
            "/sessions/:bot_id/save-status",
            get(handlers::get_save_status),
        )
        // Coaching analysis
        .route("/sessions/:bot_id/analyze", post(handlers::run_analysis))
        .route("/sessions/:bot_id/analysis", get(handlers::get_analysis))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
