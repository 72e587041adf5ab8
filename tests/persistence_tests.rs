use chrono::Utc;
use coachd::persist::{DatabaseAdapter, EntrySink, PersistError, SessionSeed};
use coachd::transcript::{BotStatus, TranscriptEntry};
use tempfile::TempDir;

fn entry(text: &str) -> TranscriptEntry {
    TranscriptEntry {
        speaker: "coach".to_string(),
        text: text.to_string(),
        timestamp: Utc::now(),
        confidence: Some(0.95),
        is_final: true,
        start_time: Some(1.0),
        end_time: Some(2.5),
    }
}

fn seed() -> SessionSeed {
    SessionSeed {
        meeting_url: "https://meet.example.com/abc".to_string(),
        client_id: Some("client-7".to_string()),
        status: Some(BotStatus::Recording),
        metadata: None,
    }
}

async fn test_adapter() -> (DatabaseAdapter, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let adapter = DatabaseAdapter::connect(&url).await.unwrap();
    adapter.init_schema().await.unwrap();
    (adapter, dir)
}

#[tokio::test]
async fn ensure_session_refuses_to_invent_ownership() {
    let (adapter, _dir) = test_adapter().await;

    // No seed at all
    let err = adapter.ensure_session("bot-1", None, None).await.unwrap_err();
    assert!(matches!(err, PersistError::InsufficientData));

    // Seed but no owning user
    let err = adapter
        .ensure_session("bot-1", None, Some(&seed()))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::InsufficientData));

    // User but empty meeting URL
    let empty = SessionSeed {
        meeting_url: String::new(),
        ..seed()
    };
    let err = adapter
        .ensure_session("bot-1", Some("user-1"), Some(&empty))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::InsufficientData));
}

#[tokio::test]
async fn ensure_session_is_idempotent() {
    let (adapter, _dir) = test_adapter().await;

    let first = adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();
    let second = adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();
    assert_eq!(first, second);

    let record = adapter.lookup_session("bot-1", None).await.unwrap().unwrap();
    assert_eq!(record.id, first);
    assert_eq!(record.user_id, "user-1");
    assert_eq!(record.client_id.as_deref(), Some("client-7"));
}

#[tokio::test]
async fn lookup_is_scoped_by_user_when_given() {
    let (adapter, _dir) = test_adapter().await;

    adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();

    assert!(adapter
        .lookup_session("bot-1", Some("user-1"))
        .await
        .unwrap()
        .is_some());
    assert!(adapter
        .lookup_session("bot-1", Some("someone-else"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn append_fails_without_a_session() {
    let (adapter, _dir) = test_adapter().await;

    let err = adapter
        .append_entries("ghost", &[entry("hello")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::SessionNotFound(_)));
}

#[tokio::test]
async fn append_resumes_exactly_at_durable_count() {
    let (adapter, _dir) = test_adapter().await;
    let session_id = adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();

    let transcript: Vec<TranscriptEntry> =
        (0..5).map(|i| entry(&format!("line {}", i))).collect();

    // First flush happened to only carry the first three entries
    let report = adapter
        .append_entries("bot-1", &transcript[..3], None)
        .await
        .unwrap();
    assert_eq!(report.saved_count, 3);
    assert_eq!(report.total_saved, 3);

    // Retry with the full transcript: the adapter slices off the durable
    // prefix and saves exactly the remaining two
    let report = adapter
        .append_entries("bot-1", &transcript, None)
        .await
        .unwrap();
    assert_eq!(report.saved_count, 2);
    assert_eq!(report.total_saved, 5);

    let stored = adapter.fetch_transcript(&session_id).await.unwrap();
    assert_eq!(stored.len(), 5);
    let indexes: Vec<i64> = stored.iter().map(|e| e.entry_index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
    assert_eq!(stored[3].text, "line 3");
    assert_eq!(stored[4].text, "line 4");
}

#[tokio::test]
async fn append_is_idempotent_when_everything_is_durable() {
    let (adapter, _dir) = test_adapter().await;
    adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();

    let transcript: Vec<TranscriptEntry> =
        (0..4).map(|i| entry(&format!("line {}", i))).collect();

    adapter
        .append_entries("bot-1", &transcript, None)
        .await
        .unwrap();

    // The caller resending the same full transcript saves nothing new
    let report = adapter
        .append_entries("bot-1", &transcript, None)
        .await
        .unwrap();
    assert_eq!(report.saved_count, 0);
    assert_eq!(report.total_saved, 4);
}

#[tokio::test]
async fn metadata_reflects_last_batch_save() {
    let (adapter, _dir) = test_adapter().await;
    adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();

    adapter
        .append_entries("bot-1", &[entry("one"), entry("two")], None)
        .await
        .unwrap();

    let record = adapter.lookup_session("bot-1", None).await.unwrap().unwrap();
    assert_eq!(
        record.metadata.get("total_transcript_entries"),
        Some(&serde_json::json!(2))
    );
    assert!(record.metadata.get("last_batch_save").is_some());
}

#[tokio::test]
async fn entry_fields_round_trip_through_storage() {
    let (adapter, _dir) = test_adapter().await;
    let session_id = adapter
        .ensure_session("bot-1", Some("user-1"), Some(&seed()))
        .await
        .unwrap();

    let mut partial = entry("still talking");
    partial.is_final = false;
    partial.confidence = None;

    adapter
        .append_entries("bot-1", &[entry("done"), partial], None)
        .await
        .unwrap();

    let stored = adapter.fetch_transcript(&session_id).await.unwrap();
    assert_eq!(stored[0].speaker, "coach");
    assert!(stored[0].is_final);
    assert_eq!(stored[0].confidence, Some(0.95f32 as f64));
    assert!(!stored[1].is_final);
    assert_eq!(stored[1].confidence, None);
}
