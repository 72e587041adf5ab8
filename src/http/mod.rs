//! HTTP API server: webhook ingestion plus monitoring/control surfaces
//!
//! - POST /webhooks/transcript - provider status/transcript events
//! - GET  /sessions - list live session projections
//! - GET  /sessions/:bot_id - single session projection
//! - GET  /sessions/:bot_id/transcript - accumulated transcript
//! - POST /sessions/:bot_id/ensure - resolve/create the durable session
//! - POST /sessions/:bot_id/save - flush unsaved entries now
//! - GET  /sessions/:bot_id/save-status - batch-save bookkeeping
//! - POST /sessions/:bot_id/analyze - run an incremental analysis pass
//! - GET  /sessions/:bot_id/analysis - latest analysis
//! - GET  /health - health check

mod handlers;
mod routes;
mod state;

pub use handlers::{WebhookEvent, WebhookKind};
pub use routes::create_router;
pub use state::AppState;
