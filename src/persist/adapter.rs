use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

use crate::transcript::{BotStatus, TranscriptEntry};

/// Failure taxonomy for durable writes.
///
/// `SessionNotFound` and `InsufficientData` are fatal for the call and the
/// caller must ensure/create first; `Insert` is fatal but safe to retry
/// (nothing was written, the high-water mark is unchanged). Metadata-update
/// failures are advisory and never surface here; they are logged inside the
/// adapter.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("coaching session not found for bot {0}")]
    SessionNotFound(String),

    #[error("session does not exist and insufficient data to create one")]
    InsufficientData,

    #[error("failed to save transcript batch: {0}")]
    Insert(#[source] sqlx::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Outcome of a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReport {
    /// Entries written by this call
    pub saved_count: usize,

    /// Durable entry count after the call (the new high-water mark)
    pub total_saved: usize,

    /// Durable session id the entries were attached to
    pub session_id: String,
}

/// Durable session row, as resolved by bot id.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub metadata: serde_json::Value,
}

/// One durable transcript row, as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub entry_index: i64,
    pub speaker: String,
    pub text: String,
    pub is_final: bool,
    pub confidence: Option<f64>,
}

/// Data required to create a durable session that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct SessionSeed {
    pub meeting_url: String,
    pub client_id: Option<String>,
    pub status: Option<BotStatus>,
    pub metadata: Option<serde_json::Value>,
}

/// Destination for transcript batches.
///
/// Seam between the batch coordinator and durable storage, so flush policy
/// can be exercised without a database.
#[async_trait]
pub trait EntrySink: Send + Sync {
    /// Append the unseen suffix of `entries` for this bot's session.
    ///
    /// The sink, not the caller, decides the resumption point, based on
    /// what is durably confirmed.
    async fn append_entries(
        &self,
        bot_id: &str,
        entries: &[TranscriptEntry],
        user_id: Option<&str>,
    ) -> Result<AppendReport, PersistError>;
}

/// Durable-storage gateway over SQLite.
///
/// Maps a live session to its durable record and appends only entries beyond
/// the durable count, making batch saves exactly-once and resumable.
#[derive(Debug, Clone)]
pub struct DatabaseAdapter {
    pool: SqlitePool,
}

impl DatabaseAdapter {
    /// Open (creating if missing) the database at `url`, e.g.
    /// `sqlite:coachd.db`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!(url, "connected to database");
        Ok(Self { pool })
    }

    /// Create the two tables this service writes, if absent.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coaching_sessions (
                id TEXT PRIMARY KEY,
                bot_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                meeting_url TEXT NOT NULL,
                client_id TEXT,
                status TEXT NOT NULL DEFAULT 'created',
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_coaching_sessions_bot_id
             ON coaching_sessions (bot_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transcript_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                coaching_session_id TEXT NOT NULL REFERENCES coaching_sessions (id),
                speaker TEXT NOT NULL,
                text TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                confidence REAL,
                is_final INTEGER NOT NULL,
                start_time REAL,
                end_time REAL,
                entry_index INTEGER NOT NULL,
                UNIQUE (coaching_session_id, entry_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up the durable session for a bot, optionally scoped to a user.
    pub async fn lookup_session(
        &self,
        bot_id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<SessionRecord>, sqlx::Error> {
        let row = match user_id {
            Some(user_id) => {
                sqlx::query(
                    "SELECT id, user_id, client_id, metadata FROM coaching_sessions
                     WHERE bot_id = ? AND user_id = ?",
                )
                .bind(bot_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, user_id, client_id, metadata FROM coaching_sessions
                     WHERE bot_id = ?",
                )
                .bind(bot_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row.map(|row| {
            let metadata: String = row.get("metadata");
            SessionRecord {
                id: row.get("id"),
                user_id: row.get("user_id"),
                client_id: row.get("client_id"),
                metadata: serde_json::from_str(&metadata)
                    .unwrap_or_else(|_| serde_json::json!({})),
            }
        }))
    }

    /// Resolve the durable session id for a bot, creating the row if needed.
    ///
    /// Creation requires an owning user id and a seed carrying the meeting
    /// URL. The adapter never invents ownership.
    pub async fn ensure_session(
        &self,
        bot_id: &str,
        user_id: Option<&str>,
        seed: Option<&SessionSeed>,
    ) -> Result<String, PersistError> {
        if let Some(existing) = self.lookup_session(bot_id, user_id).await? {
            return Ok(existing.id);
        }

        let (user_id, seed) = match (user_id, seed) {
            (Some(user_id), Some(seed)) if !seed.meeting_url.is_empty() => (user_id, seed),
            _ => return Err(PersistError::InsufficientData),
        };

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = seed.status.unwrap_or(BotStatus::Created);
        let metadata = seed
            .metadata
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));

        sqlx::query(
            "INSERT INTO coaching_sessions
                 (id, bot_id, user_id, meeting_url, client_id, status, metadata, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(bot_id)
        .bind(user_id)
        .bind(&seed.meeting_url)
        .bind(&seed.client_id)
        .bind(status.as_str())
        .bind(metadata.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(PersistError::Insert)?;

        info!(bot_id, session_id = %id, "created coaching session");
        Ok(id)
    }

    /// Read the persisted transcript back, ordered by `entry_index`.
    pub async fn fetch_transcript(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredEntry>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT entry_index, speaker, text, is_final, confidence
             FROM transcript_entries
             WHERE coaching_session_id = ?
             ORDER BY entry_index ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StoredEntry {
                entry_index: row.get("entry_index"),
                speaker: row.get("speaker"),
                text: row.get("text"),
                is_final: row.get("is_final"),
                confidence: row.get("confidence"),
            })
            .collect())
    }

    async fn durable_entry_count(&self, session_id: &str) -> Result<usize, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM transcript_entries WHERE coaching_session_id = ?",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.get("cnt");
        Ok(count as usize)
    }

    /// Best-effort session metadata refresh after a successful append.
    /// The transcript rows are the durable source of truth; this is advisory.
    async fn update_session_metadata(
        &self,
        record: &SessionRecord,
        total_saved: usize,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let mut metadata = record.metadata.clone();
        if let Some(map) = metadata.as_object_mut() {
            map.insert("last_batch_save".into(), serde_json::json!(now.to_rfc3339()));
            map.insert("total_transcript_entries".into(), serde_json::json!(total_saved));
        }

        sqlx::query("UPDATE coaching_sessions SET metadata = ?, updated_at = ? WHERE id = ?")
            .bind(metadata.to_string())
            .bind(now)
            .bind(&record.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EntrySink for DatabaseAdapter {
    async fn append_entries(
        &self,
        bot_id: &str,
        entries: &[TranscriptEntry],
        user_id: Option<&str>,
    ) -> Result<AppendReport, PersistError> {
        let record = self
            .lookup_session(bot_id, user_id)
            .await?
            .ok_or_else(|| PersistError::SessionNotFound(bot_id.to_string()))?;

        // What is durably confirmed defines the resumption point, not what
        // the caller thinks it already sent.
        let starting_index = self.durable_entry_count(&record.id).await?;

        if starting_index >= entries.len() {
            return Ok(AppendReport {
                saved_count: 0,
                total_saved: starting_index,
                session_id: record.id,
            });
        }

        let new_entries = &entries[starting_index..];

        // All-or-nothing: a failed batch leaves the durable count unchanged,
        // so the exact same batch is recomputed on the next sweep.
        let mut tx = self.pool.begin().await.map_err(PersistError::Insert)?;
        for (offset, entry) in new_entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO transcript_entries
                     (coaching_session_id, speaker, text, timestamp, confidence,
                      is_final, start_time, end_time, entry_index)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(&entry.speaker)
            .bind(&entry.text)
            .bind(entry.timestamp)
            .bind(entry.confidence.map(f64::from))
            .bind(entry.is_final)
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind((starting_index + offset) as i64)
            .execute(&mut *tx)
            .await
            .map_err(PersistError::Insert)?;
        }
        tx.commit().await.map_err(PersistError::Insert)?;

        let total_saved = starting_index + new_entries.len();

        if let Err(error) = self.update_session_metadata(&record, total_saved).await {
            warn!(bot_id, session_id = %record.id, %error, "session metadata update failed");
        }

        info!(
            bot_id,
            session_id = %record.id,
            saved = new_entries.len(),
            total = total_saved,
            "saved transcript batch"
        );

        Ok(AppendReport {
            saved_count: new_entries.len(),
            total_saved,
            session_id: record.id,
        })
    }
}
