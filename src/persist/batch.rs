use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::transcript::{BeginSave, SaveStatus, SessionStore};

use super::adapter::EntrySink;

/// When a session's unsaved entries should be flushed.
///
/// Exact thresholds are policy, not contract; these defaults are documented
/// in the coordinator tests.
#[derive(Debug, Clone)]
pub struct SavePolicy {
    /// Flush as soon as this many entries are unsaved
    pub min_unsaved_entries: usize,

    /// Flush any unsaved entries once this much time has passed since the
    /// last save (or since session creation, if never saved)
    pub max_save_interval: Duration,
}

impl Default for SavePolicy {
    fn default() -> Self {
        Self {
            min_unsaved_entries: 10,
            max_save_interval: Duration::from_secs(120),
        }
    }
}

/// Typed outcome of one flush attempt. Skips are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { count: usize },

    /// Nothing beyond the high-water mark (or unknown session)
    NoNewEntries,

    /// Another flush for this session holds the save slot
    AlreadyInProgress,

    Failed { message: String },
}

impl SaveOutcome {
    pub fn saved_count(&self) -> usize {
        match self {
            SaveOutcome::Saved { count } => *count,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SaveOutcome::Failed { .. })
    }
}

/// Decides when a session's unsaved entries are flushed and guarantees
/// at-most-one save in flight per session.
///
/// Driven by an external periodic scheduler; the coordinator itself never
/// self-schedules.
#[derive(Clone)]
pub struct BatchCoordinator {
    store: SessionStore,
    sink: Arc<dyn EntrySink>,
    policy: SavePolicy,
}

impl BatchCoordinator {
    pub fn new(store: SessionStore, sink: Arc<dyn EntrySink>, policy: SavePolicy) -> Self {
        Self { store, sink, policy }
    }

    /// Flush unsaved entries for one session.
    ///
    /// Returns `AlreadyInProgress` when another flush holds the session's
    /// save slot, a benign skip rather than an error. On failure the slot is
    /// released and no watermark is advanced; the durable count is the
    /// source of truth for "already saved", so the next sweep retries the
    /// identical batch with no duplication risk.
    pub async fn save_transcript_batch(&self, bot_id: &str) -> SaveOutcome {
        match self.store.try_begin_save(bot_id).await {
            BeginSave::AlreadyInProgress => {
                debug!(bot_id, "save already in progress, skipping");
                return SaveOutcome::AlreadyInProgress;
            }
            BeginSave::UnknownSession => return SaveOutcome::NoNewEntries,
            BeginSave::Begun => {}
        }

        let outcome = self.run_save(bot_id).await;
        self.store.end_save(bot_id).await;
        outcome
    }

    async fn run_save(&self, bot_id: &str) -> SaveOutcome {
        let Some(session) = self.store.get_session(bot_id).await else {
            return SaveOutcome::NoNewEntries;
        };

        if session.unsaved_count() == 0 {
            return SaveOutcome::NoNewEntries;
        }

        // Only the finalized prefix is eligible; a trailing in-progress
        // entry stays in memory until the provider closes it out. The sink
        // slices off the already-durable part of that prefix itself, keeping
        // the resumption decision on the durable side.
        let persistable = &session.transcript[..session.persistable_len()];
        match self.sink.append_entries(bot_id, persistable, None).await {
            Ok(report) => {
                self.store
                    .mark_entries_saved(bot_id, report.total_saved)
                    .await;
                if report.saved_count == 0 {
                    SaveOutcome::NoNewEntries
                } else {
                    info!(bot_id, saved = report.saved_count, "batch saved");
                    SaveOutcome::Saved {
                        count: report.saved_count,
                    }
                }
            }
            Err(error) => {
                error!(bot_id, %error, "batch save failed");
                SaveOutcome::Failed {
                    message: error.to_string(),
                }
            }
        }
    }

    /// Sweep all known sessions and flush those the policy selects.
    ///
    /// Saves are fired without awaiting completion so one slow or stuck
    /// session cannot block flushing the others; failures are logged inside
    /// each task.
    pub async fn check_and_save_all_sessions(&self) {
        for bot_id in self.store.get_all_session_ids().await {
            if !self.should_trigger(&bot_id).await {
                continue;
            }
            let coordinator = self.clone();
            tokio::spawn(async move {
                let outcome = coordinator.save_transcript_batch(&bot_id).await;
                if let SaveOutcome::Failed { message } = outcome {
                    error!(%bot_id, %message, "background batch save failed");
                }
            });
        }
    }

    /// Explicit "flush now" entry point (e.g. session-end webhook). Funnels
    /// through the same guarded path as the sweep.
    pub async fn force_save_session(&self, bot_id: &str) -> SaveOutcome {
        self.save_transcript_batch(bot_id).await
    }

    pub async fn get_save_status(&self, bot_id: &str) -> Option<SaveStatus> {
        self.store.save_status(bot_id).await
    }

    pub fn policy(&self) -> &SavePolicy {
        &self.policy
    }

    async fn should_trigger(&self, bot_id: &str) -> bool {
        let Some(session) = self.store.get_session(bot_id).await else {
            return false;
        };
        if session.save_in_progress {
            return false;
        }

        let unsaved = session.unsaved_count();
        if unsaved == 0 {
            return false;
        }
        if unsaved >= self.policy.min_unsaved_entries {
            return true;
        }

        let last = session.last_save_at.unwrap_or(session.created_at);
        let elapsed = (Utc::now() - last).to_std().unwrap_or_default();
        elapsed >= self.policy.max_save_interval
    }
}
