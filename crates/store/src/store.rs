use {async_trait::async_trait, sqlx::SqlitePool, tracing::debug};

use voicebridge_common::{Role, now_ts};

use crate::error::{Error, Result};

/// One row per distinct sender address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub created_at: i64,
}

/// A persisted conversation message, user- or AI-authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub role: Role,
    pub created_at: i64,
}

/// Session liveness marker, logically one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub last_active: i64,
}

/// Persistent conversation state behind the pipeline.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Resolve the user row for a sender, creating it on first contact.
    /// Idempotent under concurrency: the upsert is keyed on the unique
    /// `phone` column, never read-then-write.
    async fn find_or_create_user(&self, phone: &str) -> Result<User>;

    /// Append one message. Returns the stored row with its id and timestamp.
    async fn append_message(
        &self,
        user_id: i64,
        role: Role,
        text: &str,
    ) -> Result<StoredMessage>;

    /// The last `limit` messages for a user in chronological ascending
    /// order. Empty history is a valid result.
    async fn recent_messages(&self, user_id: i64, limit: u32) -> Result<Vec<StoredMessage>>;

    /// Upsert the user's session `last_active` to now. Last-writer-wins.
    async fn touch_session(&self, user_id: i64) -> Result<()>;
}

/// SQLite-backed conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the schema if absent. In-memory test databases carry no
    /// migration history, so this runs on every startup.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                phone      TEXT    NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id),
                text       TEXT    NOT NULL,
                role       TEXT    NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_user
             ON messages (user_id, id DESC)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id),
                last_active INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn find_or_create_user(&self, phone: &str) -> Result<User> {
        // Two concurrent first contacts both run the insert; the unique
        // constraint keeps one row and both reads agree on it.
        sqlx::query(
            "INSERT INTO users (phone, created_at) VALUES (?, ?)
             ON CONFLICT(phone) DO NOTHING",
        )
        .bind(phone)
        .bind(now_ts())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, (i64, String, i64)>(
            "SELECT id, phone, created_at FROM users WHERE phone = ?",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.0,
            phone: row.1,
            created_at: row.2,
        })
    }

    async fn append_message(
        &self,
        user_id: i64,
        role: Role,
        text: &str,
    ) -> Result<StoredMessage> {
        let now = now_ts();
        let res = sqlx::query(
            "INSERT INTO messages (user_id, text, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(text)
        .bind(role.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = res.last_insert_rowid();
        debug!(user_id, id, role = %role, "message appended");

        Ok(StoredMessage {
            id,
            user_id,
            text: text.to_string(),
            role,
            created_at: now,
        })
    }

    async fn recent_messages(&self, user_id: i64, limit: u32) -> Result<Vec<StoredMessage>> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, i64)>(
            "SELECT id, user_id, text, role, created_at
             FROM messages
             WHERE user_id = ?
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .into_iter()
            .map(|r| {
                let role = r.3.parse::<Role>().map_err(|e| Error::Corrupt(e.to_string()))?;
                Ok(StoredMessage {
                    id: r.0,
                    user_id: r.1,
                    text: r.2,
                    role,
                    created_at: r.4,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Query runs newest-first for the LIMIT; callers want oldest-first.
        messages.reverse();
        Ok(messages)
    }

    async fn touch_session(&self, user_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (user_id, last_active) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET last_active = excluded.last_active",
        )
        .bind(user_id)
        .bind(now_ts())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
