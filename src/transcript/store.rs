use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::entry::{BotInfo, BotStatus, TranscriptEntry};
use super::info::{SaveStatus, SessionInfo};

/// In-memory state for one live coaching call.
#[derive(Debug, Clone)]
pub struct BotSession {
    pub bot: BotInfo,

    /// Ordered transcript; insertion order is chronological
    pub transcript: Vec<TranscriptEntry>,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// Number of webhook events received for this session
    pub webhook_events: u64,

    /// Local view of the durable high-water mark. The persistence layer is
    /// the source of truth; this only drives the save-trigger policy.
    pub saved_count: usize,

    pub save_in_progress: bool,
    pub last_save_at: Option<DateTime<Utc>>,
}

impl BotSession {
    fn new(bot: BotInfo) -> Self {
        let now = Utc::now();
        Self {
            bot,
            transcript: Vec::new(),
            created_at: now,
            last_updated: now,
            webhook_events: 0,
            saved_count: 0,
            save_in_progress: false,
            last_save_at: None,
        }
    }

    /// Length of the transcript prefix that is safe to persist: everything
    /// except a trailing entry the provider may still revise. Persisting an
    /// in-progress entry would freeze a stale revision at its index while
    /// the in-memory copy moves on.
    pub fn persistable_len(&self) -> usize {
        match self.transcript.last() {
            Some(last) if !last.is_final => self.transcript.len() - 1,
            _ => self.transcript.len(),
        }
    }

    /// Persistable entries beyond the local high-water mark.
    pub fn unsaved_count(&self) -> usize {
        self.persistable_len().saturating_sub(self.saved_count)
    }

    fn info(&self, bot_id: &str) -> SessionInfo {
        SessionInfo {
            bot_id: bot_id.to_string(),
            status: self.bot.status,
            meeting_url: self.bot.meeting_url.clone(),
            platform: self.bot.platform.clone(),
            meeting_id: self.bot.meeting_id.clone(),
            transcript_count: self.transcript.len(),
            webhook_events: self.webhook_events,
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }

    fn save_status(&self) -> SaveStatus {
        SaveStatus {
            in_progress: self.save_in_progress,
            saved_count: self.saved_count,
            unsaved_count: self.unsaved_count(),
            last_save_at: self.last_save_at,
        }
    }
}

/// Result of claiming the per-session save slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginSave {
    /// Slot claimed; caller must release it with `end_save`
    Begun,
    /// Another flush holds the slot
    AlreadyInProgress,
    UnknownSession,
}

/// Process-wide registry of active sessions, keyed by bot/call id.
///
/// Single source of truth for live transcript state. All mutations run
/// inside one write-lock critical section, so concurrent webhook handlers
/// cannot interleave a read-modify-write. The store performs no I/O and no
/// self-scheduling; sweeps are driven by the caller.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, BotSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session, or overwrite bot metadata on an existing one.
    ///
    /// Idempotent: an existing transcript is never touched, only the bot
    /// metadata and `last_updated` are refreshed.
    pub async fn init_session(&self, bot_id: &str, bot: BotInfo) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(bot_id) {
            Some(session) => {
                debug!(bot_id, "refreshing metadata on existing session");
                session.bot = bot;
                session.last_updated = Utc::now();
            }
            None => {
                info!(bot_id, "initialized new session");
                sessions.insert(bot_id.to_string(), BotSession::new(bot));
            }
        }
    }

    /// Update bot status. No-op when the session is absent.
    pub async fn update_status(&self, bot_id: &str, status: BotStatus) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(bot_id) {
            Some(session) => {
                let old = session.bot.status;
                session.bot.status = status;
                session.last_updated = Utc::now();
                session.webhook_events += 1;
                info!(bot_id, %old, new = %status, "bot status updated");
            }
            None => {
                warn!(bot_id, "status update for unknown session ignored");
            }
        }
    }

    /// Add a transcript entry, merging streaming refinements.
    ///
    /// If no session exists one is created implicitly with placeholder
    /// metadata; ingestion must never be blocked by an init call arriving
    /// late or out of order.
    ///
    /// Merge rule: while the trailing stored entry is non-final, an incoming
    /// entry replaces it: a newer partial refines the in-progress
    /// utterance, a final closes it out. In every other case (store empty,
    /// or trailing entry already final) the entry is appended. Each
    /// utterance therefore ends up as exactly one entry, in order, and
    /// live-caption noise never accumulates.
    pub async fn add_entry(&self, bot_id: &str, entry: TranscriptEntry) {
        let mut sessions = self.sessions.write().await;

        let session = sessions.entry(bot_id.to_string()).or_insert_with(|| {
            info!(bot_id, "transcript event outran init; creating session with placeholder metadata");
            BotSession::new(BotInfo::placeholder(bot_id))
        });

        session.webhook_events += 1;

        let replace_last = session
            .transcript
            .last()
            .is_some_and(|last| !last.is_final);

        if replace_last {
            let last = session.transcript.len() - 1;
            debug!(bot_id, is_final = entry.is_final, "replaced trailing partial entry");
            session.transcript[last] = entry;
        } else {
            debug!(bot_id, is_final = entry.is_final, "appended entry");
            session.transcript.push(entry);
        }

        session.last_updated = Utc::now();
    }

    pub async fn get_session(&self, bot_id: &str) -> Option<BotSession> {
        self.sessions.read().await.get(bot_id).cloned()
    }

    pub async fn get_transcript(&self, bot_id: &str) -> Option<Vec<TranscriptEntry>> {
        self.sessions
            .read()
            .await
            .get(bot_id)
            .map(|s| s.transcript.clone())
    }

    pub async fn get_all_session_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn get_session_info(&self, bot_id: &str) -> Option<SessionInfo> {
        self.sessions
            .read()
            .await
            .get(bot_id)
            .map(|s| s.info(bot_id))
    }

    pub async fn get_all_sessions_info(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(bot_id, session)| session.info(bot_id))
            .collect()
    }

    /// Atomically claim the per-session save slot (test-and-set).
    pub async fn try_begin_save(&self, bot_id: &str) -> BeginSave {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(bot_id) {
            Some(session) if session.save_in_progress => BeginSave::AlreadyInProgress,
            Some(session) => {
                session.save_in_progress = true;
                BeginSave::Begun
            }
            None => BeginSave::UnknownSession,
        }
    }

    /// Release the save slot claimed by `try_begin_save`.
    pub async fn end_save(&self, bot_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(bot_id) {
            session.save_in_progress = false;
        }
    }

    /// Advance the local high-water mark to `total_saved` durable entries.
    ///
    /// Never moves backward, and never past the in-memory transcript length
    /// (the durable count is always ≤ the in-memory length).
    pub async fn mark_entries_saved(&self, bot_id: &str, total_saved: usize) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(bot_id) {
            let capped = total_saved.min(session.transcript.len());
            session.saved_count = session.saved_count.max(capped);
            session.last_save_at = Some(Utc::now());
        }
    }

    pub async fn save_status(&self, bot_id: &str) -> Option<SaveStatus> {
        self.sessions
            .read()
            .await
            .get(bot_id)
            .map(|s| s.save_status())
    }

    /// Remove sessions whose `last_updated` exceeds the age cutoff.
    ///
    /// Invoked by an external scheduler; returns the number evicted.
    pub async fn cleanup_old_sessions(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|bot_id, session| {
            let keep = session.last_updated >= cutoff;
            if !keep {
                info!(%bot_id, last_updated = %session.last_updated, "evicting stale session");
            }
            keep
        });
        before - sessions.len()
    }
}
