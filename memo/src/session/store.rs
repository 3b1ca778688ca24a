//! Durable thread store backends.
//!
//! The store is the long-lived mirror of `user → session`. The session
//! manager treats every store failure as non-fatal, so backends are free to
//! surface raw I/O errors.

use super::{Session, UserId};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for durable session storage backends.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Load the stored session for a user.
    async fn get(&self, user_id: UserId) -> StoreResult<Option<Session>>;

    /// Insert or replace the session for `session.user_id`.
    async fn put(&self, session: &Session) -> StoreResult<()>;

    /// Refresh the last-used timestamp. A missing user is not an error.
    async fn touch(&self, user_id: UserId) -> StoreResult<()>;

    /// Remove the stored session for a user. A missing user is not an error.
    async fn delete(&self, user_id: UserId) -> StoreResult<()>;
}

/// In-memory thread store.
///
/// Fast but not persistent across restarts.
#[derive(Debug, Default)]
pub struct MemoryThreadStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl MemoryThreadStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn get(&self, user_id: UserId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().await.get(&user_id).cloned())
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.user_id, session.clone());
        Ok(())
    }

    async fn touch(&self, user_id: UserId) -> StoreResult<()> {
        if let Some(session) = self.sessions.write().await.get_mut(&user_id) {
            session.touch();
        }
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> StoreResult<()> {
        self.sessions.write().await.remove(&user_id);
        Ok(())
    }
}

/// File-based thread store.
///
/// Persists one JSON document per user in a directory.
#[derive(Debug)]
pub struct FileThreadStore {
    base_path: PathBuf,
}

impl FileThreadStore {
    /// Create a new file store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding the session files.
    #[must_use]
    pub const fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn session_path(&self, user_id: UserId) -> PathBuf {
        self.base_path.join(format!("{user_id}.json"))
    }

    async fn ensure_dir(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    async fn write(&self, session: &Session) -> StoreResult<()> {
        self.ensure_dir().await?;
        let content = serde_json::to_string_pretty(session)?;
        tokio::fs::write(self.session_path(session.user_id), content).await?;
        Ok(())
    }
}

#[async_trait]
impl ThreadStore for FileThreadStore {
    async fn get(&self, user_id: UserId) -> StoreResult<Option<Session>> {
        let path = self.session_path(user_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: Session = serde_json::from_str(&content)?;
        debug!(user_id, "loaded session from file");
        Ok(Some(session))
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        self.write(session).await?;
        debug!(user_id = session.user_id, "saved session to file");
        Ok(())
    }

    async fn touch(&self, user_id: UserId) -> StoreResult<()> {
        if let Some(mut session) = self.get(user_id).await? {
            session.touch();
            self.write(&session).await?;
        }
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> StoreResult<()> {
        match tokio::fs::remove_file(self.session_path(user_id)).await {
            Ok(()) => {
                debug!(user_id, "deleted session file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryThreadStore::new();

        let session = Session::new(42, "thread_a");
        store.put(&session).await.unwrap();

        let loaded = store.get(42).await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "thread_a");
        assert_eq!(store.len().await, 1);

        // Replace
        store.put(&Session::new(42, "thread_b")).await.unwrap();
        assert_eq!(store.get(42).await.unwrap().unwrap().session_id, "thread_b");
        assert_eq!(store.len().await, 1);

        store.delete(42).await.unwrap();
        assert!(store.get(42).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_touch() {
        let store = MemoryThreadStore::new();
        let session = Session::new(7, "thread_a");
        store.put(&session).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.touch(7).await.unwrap();
        let touched = store.get(7).await.unwrap().unwrap();
        assert!(touched.last_used_at > session.last_used_at);
        assert_eq!(touched.created_at, session.created_at);

        // Unknown users are ignored
        store.touch(8).await.unwrap();
        assert!(store.get(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path().join("threads"));

        assert!(store.get(1).await.unwrap().is_none());
        store.delete(1).await.unwrap();

        let session = Session::new(1, "thread_file");
        store.put(&session).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(session.clone()));

        store.touch(1).await.unwrap();
        let touched = store.get(1).await.unwrap().unwrap();
        assert!(touched.last_used_at >= session.last_used_at);

        store.delete(1).await.unwrap();
        assert!(store.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path());
        std::fs::write(dir.path().join("5.json"), "not json").unwrap();

        assert!(store.get(5).await.is_err());
    }
}
