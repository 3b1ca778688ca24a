//! Per-user assistant sessions.
//!
//! A [`Session`] binds one user to one remote assistant thread. The
//! [`ThreadSessionManager`] keeps sessions consistent across a fast
//! in-process [`SessionCache`] and a durable [`ThreadStore`], validating
//! both tiers against the remote assistant before trusting them.

mod cache;
mod locks;
mod manager;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;

pub use cache::{MemorySessionCache, SessionCache};
pub use locks::{UserGuard, UserLocks};
pub use manager::ThreadSessionManager;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteThreadStore;
pub use store::{FileThreadStore, MemoryThreadStore, ThreadStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable external identity of a user (e.g., a chat platform user ID).
pub type UserId = i64;

/// One durable conversational context with the remote assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Owner of the session.
    pub user_id: UserId,
    /// Opaque thread identifier issued by the remote assistant.
    pub session_id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last used for a turn.
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    /// Create a session record stamped with the current time.
    #[must_use]
    pub fn new(user_id: UserId, session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            session_id: session_id.into(),
            created_at: now,
            last_used_at: now,
        }
    }

    /// Refresh the last-used timestamp.
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }
}
