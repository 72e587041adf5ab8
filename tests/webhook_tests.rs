use coachd::http::{WebhookEvent, WebhookKind};
use coachd::transcript::{BotStatus, TranscriptEntry};

#[test]
fn test_transcript_event_deserialization() {
    let json = r#"{
        "bot_id": "bot-42",
        "type": "transcript",
        "entry": {
            "speaker": "coach",
            "text": "Hello there",
            "timestamp": "2026-08-07T14:30:05Z",
            "confidence": 0.95,
            "is_final": true,
            "start_time": 12.5,
            "end_time": 14.0
        }
    }"#;

    let event: WebhookEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.bot_id, "bot-42");
    assert_eq!(event.kind, WebhookKind::Transcript);

    let entry = event.entry.unwrap();
    assert_eq!(entry.speaker, "coach");
    assert_eq!(entry.text, "Hello there");
    assert!(entry.is_final);
    assert_eq!(entry.confidence, Some(0.95));
    assert_eq!(entry.start_time, Some(12.5));
}

#[test]
fn test_partial_entry_without_confidence() {
    let json = r#"{
        "bot_id": "bot-42",
        "type": "transcript",
        "entry": {
            "speaker": "client",
            "text": "I was thinki",
            "timestamp": "2026-08-07T14:30:05Z",
            "is_final": false
        }
    }"#;

    let event: WebhookEvent = serde_json::from_str(json).unwrap();
    let entry = event.entry.unwrap();
    assert!(!entry.is_final);
    assert_eq!(entry.confidence, None);
    assert_eq!(entry.start_time, None);
    assert_eq!(entry.end_time, None);
}

#[test]
fn test_status_event_deserialization() {
    let json = r#"{
        "bot_id": "bot-42",
        "type": "status",
        "status": "in_call"
    }"#;

    let event: WebhookEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.kind, WebhookKind::Status);
    assert_eq!(event.status, Some(BotStatus::InCall));
    assert!(event.entry.is_none());
}

#[test]
fn test_unknown_event_kind_is_tolerated() {
    // Providers add event kinds over time; unknown ones must still parse so
    // the handler can acknowledge them
    let json = r#"{
        "bot_id": "bot-42",
        "type": "recording.artifact_ready"
    }"#;

    let event: WebhookEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.kind, WebhookKind::Other);
}

#[test]
fn test_entry_serialization_round_trip() {
    let json = r#"{
        "speaker": "coach",
        "text": "What would make this call valuable?",
        "timestamp": "2026-08-07T15:00:00Z",
        "confidence": 0.88,
        "is_final": true
    }"#;

    let entry: TranscriptEntry = serde_json::from_str(json).unwrap();
    let serialized = serde_json::to_string(&entry).unwrap();
    assert!(serialized.contains("\"is_final\":true"));
    assert!(serialized.contains("What would make this call valuable?"));

    let back: TranscriptEntry = serde_json::from_str(&serialized).unwrap();
    assert_eq!(back.text, entry.text);
    assert_eq!(back.confidence, entry.confidence);
}
