//! In-process session cache.

use super::{Session, UserId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Fast lookup tier in front of the durable [`ThreadStore`](super::ThreadStore).
///
/// Implementations are synchronous: every operation is a short map access
/// and must never be held across an `.await`.
pub trait SessionCache: Send + Sync {
    /// Look up the cached session for a user.
    fn get(&self, user_id: UserId) -> Option<Session>;

    /// Insert or replace the cached session for `session.user_id`.
    fn insert(&self, session: Session);

    /// Remove and return the cached session for a user.
    fn remove(&self, user_id: UserId) -> Option<Session>;

    /// Number of cached sessions.
    fn len(&self) -> usize;

    /// Check if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default [`SessionCache`] backed by a `HashMap` behind a read-write lock.
///
/// Lookups run concurrently; inserts and removals are exclusive only for
/// the duration of the map mutation.
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    entries: RwLock<HashMap<UserId, Session>>,
}

impl MemorySessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, user_id: UserId) -> Option<Session> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    fn insert(&self, session: Session) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.user_id, session);
    }

    fn remove(&self, user_id: UserId) -> Option<Session> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id)
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
