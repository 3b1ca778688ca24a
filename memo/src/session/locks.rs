//! Per-user async mutual exclusion.

use super::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A set of per-user async locks.
///
/// Holding the guard for one user never blocks callers working on behalf of
/// another user. Entries are dropped once no caller holds or waits on them.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    /// Create an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access on behalf of `user_id`.
    pub async fn lock(&self, user_id: UserId) -> UserGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id).or_default())
        };

        UserGuard {
            owner: self,
            user_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of users with a live lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if no user currently holds or waits on a lock.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, user_id: UserId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference remains: nobody holds or awaits it.
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
    }
}

/// Exclusive access for one user, released on drop.
#[derive(Debug)]
pub struct UserGuard<'a> {
    owner: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps its Arc alive; drop it before pruning.
        drop(self.guard.take());
        self.owner.release(self.user_id);
    }
}
