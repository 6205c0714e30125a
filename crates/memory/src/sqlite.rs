//! SQLite checkpoint store.
//!
//! One table, `checkpoint_turns`, holding every message of every thread as a
//! JSON document. Rows are only ever inserted; `seq` orders a thread's turns.

use async_trait::async_trait;
use merlin_core::checkpoint::CheckpointStore;
use merlin_core::error::MemoryError;
use merlin_core::message::ChatMessage;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite checkpoint store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoint_turns (
                thread_id   TEXT NOT NULL,
                seq         INTEGER NOT NULL,
                message     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (thread_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("checkpoint_turns table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, thread_id: &str) -> Result<Vec<ChatMessage>, MemoryError> {
        let rows = sqlx::query("SELECT message FROM checkpoint_turns WHERE thread_id = ?1 ORDER BY seq ASC")
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("checkpoint read: {e}")))?;

        rows.iter()
            .map(|row| {
                let json: String = row
                    .try_get("message")
                    .map_err(|e| MemoryError::QueryFailed(format!("message column: {e}")))?;
                serde_json::from_str(&json)
                    .map_err(|e| MemoryError::QueryFailed(format!("corrupt checkpoint turn: {e}")))
            })
            .collect()
    }

    async fn append(&self, thread_id: &str, turns: Vec<ChatMessage>) -> Result<(), MemoryError> {
        if turns.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MemoryError::Storage(format!("begin: {e}")))?;

        let next: i64 = sqlx::query("SELECT COALESCE(MAX(seq), -1) + 1 AS next FROM checkpoint_turns WHERE thread_id = ?1")
            .bind(thread_id)
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("next"))
            .map_err(|e| MemoryError::QueryFailed(format!("next seq: {e}")))?;

        for (offset, turn) in turns.iter().enumerate() {
            let json = serde_json::to_string(turn)
                .map_err(|e| MemoryError::Storage(format!("turn serialization: {e}")))?;
            sqlx::query(
                "INSERT INTO checkpoint_turns (thread_id, seq, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(thread_id)
            .bind(next + offset as i64)
            .bind(json)
            .bind(turn.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| MemoryError::Storage(format!("append: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| MemoryError::Storage(format!("commit: {e}")))?;

        debug!(thread_id, count = turns.len(), "Checkpoint appended");
        Ok(())
    }
}
