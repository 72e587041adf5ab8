use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use coachd::persist::{
    AppendReport, BatchCoordinator, EntrySink, PersistError, SaveOutcome, SavePolicy,
};
use coachd::transcript::{BotInfo, BotStatus, SessionStore, TranscriptEntry};
use tokio::sync::Mutex;

fn entry(text: &str) -> TranscriptEntry {
    TranscriptEntry {
        speaker: "coach".to_string(),
        text: text.to_string(),
        timestamp: Utc::now(),
        confidence: Some(0.9),
        is_final: true,
        start_time: None,
        end_time: None,
    }
}

fn bot(bot_id: &str) -> BotInfo {
    BotInfo {
        id: bot_id.to_string(),
        status: BotStatus::Recording,
        meeting_url: "https://meet.example.com/abc".to_string(),
        platform: None,
        meeting_id: None,
    }
}

/// Scriptable sink: simulates durable storage per bot, optionally slow,
/// optionally failing the next N calls.
struct MockSink {
    durable: Mutex<HashMap<String, Vec<TranscriptEntry>>>,
    calls: AtomicUsize,
    delay: Duration,
    fail_next: AtomicUsize,
}

impl MockSink {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            durable: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            delay,
            fail_next: AtomicUsize::new(0),
        })
    }

    async fn durable_len(&self, bot_id: &str) -> usize {
        self.durable
            .lock()
            .await
            .get(bot_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl EntrySink for MockSink {
    async fn append_entries(
        &self,
        bot_id: &str,
        entries: &[TranscriptEntry],
        _user_id: Option<&str>,
    ) -> Result<AppendReport, PersistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PersistError::Insert(sqlx::Error::PoolClosed));
        }

        let mut durable = self.durable.lock().await;
        let rows = durable.entry(bot_id.to_string()).or_default();
        let start = rows.len().min(entries.len());
        let saved = entries.len() - start;
        rows.extend_from_slice(&entries[start..]);

        Ok(AppendReport {
            saved_count: saved,
            total_saved: rows.len(),
            session_id: format!("session-{}", bot_id),
        })
    }
}

async fn store_with_entries(bot_id: &str, count: usize) -> SessionStore {
    let store = SessionStore::new();
    store.init_session(bot_id, bot(bot_id)).await;
    for i in 0..count {
        store.add_entry(bot_id, entry(&format!("line {}", i))).await;
    }
    store
}

#[tokio::test]
async fn save_flushes_unsaved_entries_and_advances_watermark() {
    let store = store_with_entries("bot-1", 5).await;
    let sink = MockSink::new();
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    let outcome = coordinator.save_transcript_batch("bot-1").await;
    assert_eq!(outcome, SaveOutcome::Saved { count: 5 });
    assert_eq!(sink.durable_len("bot-1").await, 5);

    let status = store.save_status("bot-1").await.unwrap();
    assert_eq!(status.saved_count, 5);
    assert!(!status.in_progress);
}

#[tokio::test]
async fn second_save_skips_while_first_is_in_flight() {
    let store = store_with_entries("bot-1", 5).await;
    let sink = MockSink::with_delay(Duration::from_millis(200));
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    let background = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.save_transcript_batch("bot-1").await })
    };

    // Let the first save claim the slot and block inside the sink
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = coordinator.save_transcript_batch("bot-1").await;
    assert_eq!(second, SaveOutcome::AlreadyInProgress);
    assert_eq!(second.saved_count(), 0);

    let first = background.await.unwrap();
    assert_eq!(first, SaveOutcome::Saved { count: 5 });
    // Exactly one underlying persistence call
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_saves_result_in_one_persistence_call() {
    let store = store_with_entries("bot-1", 5).await;
    let sink = MockSink::with_delay(Duration::from_millis(100));
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    let a = coordinator.clone();
    let b = coordinator.clone();
    let (first, second) = tokio::join!(
        a.save_transcript_batch("bot-1"),
        b.save_transcript_batch("bot-1"),
    );

    let outcomes = [first, second];
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SaveOutcome::Saved { count: 5 }))
            .count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SaveOutcome::AlreadyInProgress))
            .count(),
        1
    );
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.durable_len("bot-1").await, 5);
}

#[tokio::test]
async fn failed_save_is_retried_with_the_identical_batch() {
    let store = store_with_entries("bot-1", 5).await;
    let sink = MockSink::new();
    sink.fail_next.store(1, Ordering::SeqCst);
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    let outcome = coordinator.save_transcript_batch("bot-1").await;
    assert!(outcome.is_failure());

    // Nothing durable, watermark unchanged, slot released
    assert_eq!(sink.durable_len("bot-1").await, 0);
    let status = store.save_status("bot-1").await.unwrap();
    assert_eq!(status.saved_count, 0);
    assert!(!status.in_progress);

    // Next sweep retries the exact same batch with no duplication
    let outcome = coordinator.save_transcript_batch("bot-1").await;
    assert_eq!(outcome, SaveOutcome::Saved { count: 5 });
    assert_eq!(sink.durable_len("bot-1").await, 5);
}

#[tokio::test]
async fn nothing_to_save_is_a_benign_skip() {
    let store = store_with_entries("bot-1", 2).await;
    let sink = MockSink::new();
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    assert_eq!(
        coordinator.save_transcript_batch("bot-1").await,
        SaveOutcome::Saved { count: 2 }
    );
    assert_eq!(
        coordinator.save_transcript_batch("bot-1").await,
        SaveOutcome::NoNewEntries
    );
    // Second call never reached the sink
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

    assert_eq!(
        coordinator.save_transcript_batch("ghost").await,
        SaveOutcome::NoNewEntries
    );
}

#[tokio::test]
async fn trailing_partial_stays_in_memory_until_finalized() {
    let store = store_with_entries("bot-1", 2).await;
    let mut partial = entry("thinki");
    partial.is_final = false;
    store.add_entry("bot-1", partial).await;

    let sink = MockSink::new();
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    // The in-progress entry is held back
    let outcome = coordinator.save_transcript_batch("bot-1").await;
    assert_eq!(outcome, SaveOutcome::Saved { count: 2 });
    assert_eq!(sink.durable_len("bot-1").await, 2);

    // Once finalized it flushes at the next index, with the final text
    store.add_entry("bot-1", entry("thinking out loud")).await;
    let outcome = coordinator.save_transcript_batch("bot-1").await;
    assert_eq!(outcome, SaveOutcome::Saved { count: 1 });

    let durable = sink.durable.lock().await;
    let rows = &durable["bot-1"];
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].text, "thinking out loud");
    assert!(rows[2].is_final);
}

#[tokio::test]
async fn default_policy_is_ten_entries_or_two_minutes() {
    // The trigger thresholds are policy, not contract; these are the
    // documented defaults.
    let policy = SavePolicy::default();
    assert_eq!(policy.min_unsaved_entries, 10);
    assert_eq!(policy.max_save_interval, Duration::from_secs(120));
}

#[tokio::test]
async fn sweep_only_flushes_sessions_past_the_threshold() {
    let store = SessionStore::new();
    store.init_session("small", bot("small")).await;
    store.init_session("big", bot("big")).await;
    for i in 0..3 {
        store.add_entry("small", entry(&format!("s{}", i))).await;
    }
    for i in 0..12 {
        store.add_entry("big", entry(&format!("b{}", i))).await;
    }

    let sink = MockSink::new();
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    coordinator.check_and_save_all_sessions().await;
    // Saves are fire-and-forget; give the spawned tasks a moment
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.durable_len("big").await, 12);
    assert_eq!(sink.durable_len("small").await, 0);
}

#[tokio::test]
async fn sweep_saves_age_out_small_sessions() {
    let store = store_with_entries("bot-1", 1).await;
    let sink = MockSink::new();
    let coordinator = BatchCoordinator::new(
        store.clone(),
        sink.clone(),
        SavePolicy {
            min_unsaved_entries: 10,
            max_save_interval: Duration::ZERO,
        },
    );

    // One unsaved entry, below the count threshold, but the interval has
    // (trivially) elapsed
    coordinator.check_and_save_all_sessions().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.durable_len("bot-1").await, 1);
}

#[tokio::test]
async fn slow_session_does_not_block_flushing_others() {
    let store = SessionStore::new();
    store.init_session("stuck", bot("stuck")).await;
    store.init_session("healthy", bot("healthy")).await;
    for i in 0..12 {
        store.add_entry("stuck", entry(&format!("s{}", i))).await;
        store.add_entry("healthy", entry(&format!("h{}", i))).await;
    }

    let sink = MockSink::with_delay(Duration::from_millis(300));
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    // Occupy "stuck" with a long-running save
    let background = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.save_transcript_batch("stuck").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    coordinator.check_and_save_all_sessions().await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    // The sweep skipped the occupied session but flushed the healthy one
    assert_eq!(sink.durable_len("healthy").await, 12);
    assert_eq!(background.await.unwrap(), SaveOutcome::Saved { count: 12 });
}

#[tokio::test]
async fn force_save_funnels_through_the_same_guard() {
    let store = store_with_entries("bot-1", 3).await;
    let sink = MockSink::with_delay(Duration::from_millis(150));
    let coordinator = BatchCoordinator::new(store.clone(), sink.clone(), SavePolicy::default());

    let background = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.save_transcript_batch("bot-1").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(
        coordinator.force_save_session("bot-1").await,
        SaveOutcome::AlreadyInProgress
    );
    assert_eq!(background.await.unwrap(), SaveOutcome::Saved { count: 3 });

    let status = coordinator.get_save_status("bot-1").await.unwrap();
    assert_eq!(status.saved_count, 3);
    assert_eq!(status.unsaved_count, 0);
}
