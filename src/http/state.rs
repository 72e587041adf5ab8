use std::sync::Arc;

use crate::analysis::AnalysisEngine;
use crate::persist::{BatchCoordinator, DatabaseAdapter};
use crate::transcript::SessionStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live session registry (bot id → session)
    pub store: SessionStore,

    /// Batch-save policy and at-most-one-in-flight guard
    pub coordinator: BatchCoordinator,

    /// Incremental analysis passes + latest results
    pub engine: AnalysisEngine,

    /// Durable gateway, used directly for session/client resolution
    pub adapter: Arc<DatabaseAdapter>,
}

impl AppState {
    pub fn new(
        store: SessionStore,
        coordinator: BatchCoordinator,
        engine: AnalysisEngine,
        adapter: Arc<DatabaseAdapter>,
    ) -> Self {
        Self {
            store,
            coordinator,
            engine,
            adapter,
        }
    }
}
