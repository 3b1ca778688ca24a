//! SQLite-backed thread store.
//!
//! Mirrors the `assistant_threads` table of the original deployment: one row
//! per user, upserted on every new session.

use super::{Session, ThreadStore, UserId};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS assistant_threads (
    user_id      INTEGER PRIMARY KEY,
    thread_id    TEXT    NOT NULL,
    created_at   TEXT    NOT NULL,
    last_used_at TEXT    NOT NULL
);
";

/// Thread store persisted in a SQLite database.
///
/// Blocking database calls run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteThreadStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteThreadStore {
    /// Open (or create) a database file and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|e| StoreError::Lock(e.to_string()))?;
            f(&guard)
        })
        .await?
    }
}

fn parse_time(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::backend("sqlite", format!("bad timestamp {raw:?}: {e}")))
}

#[async_trait]
impl ThreadStore for SqliteThreadStore {
    async fn get(&self, user_id: UserId) -> StoreResult<Option<Session>> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT thread_id, created_at, last_used_at
                     FROM assistant_threads WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(session_id, created_at, last_used_at)| {
                Ok(Session {
                    user_id,
                    session_id,
                    created_at: parse_time(&created_at)?,
                    last_used_at: parse_time(&last_used_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        let session = session.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO assistant_threads (user_id, thread_id, created_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET
                     thread_id = excluded.thread_id,
                     created_at = excluded.created_at,
                     last_used_at = excluded.last_used_at",
                params![
                    session.user_id,
                    session.session_id,
                    session.created_at.to_rfc3339(),
                    session.last_used_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn touch(&self, user_id: UserId) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE assistant_threads SET last_used_at = ?1 WHERE user_id = ?2",
                params![now, user_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, user_id: UserId) -> StoreResult<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM assistant_threads WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
        .await
    }
}
