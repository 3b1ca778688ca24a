//! Thread session manager: resolves one valid remote session per user.

use super::cache::{MemorySessionCache, SessionCache};
use super::locks::UserLocks;
use super::store::ThreadStore;
use super::{Session, UserId};
use crate::assistant::SharedAssistantClient;
use crate::error::SessionError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the session cache and reconciles it with the durable store.
///
/// Resolution order for a user:
///
/// 1. cached session, if the remote assistant still knows it;
/// 2. stored session, if the remote assistant still knows it;
/// 3. a newly created session, written to both tiers.
///
/// Stale entries found along the way are removed from both tiers. Store
/// failures are logged and ignored; only a failure to create a new remote
/// session is reported to the caller.
///
/// Resolves for the same user are mutually exclusive, so concurrent first
/// messages from one user create exactly one remote session. Resolves for
/// different users run fully in parallel.
pub struct ThreadSessionManager {
    assistant: SharedAssistantClient,
    store: Arc<dyn ThreadStore>,
    cache: Arc<dyn SessionCache>,
    locks: UserLocks,
}

impl std::fmt::Debug for ThreadSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadSessionManager")
            .field("cached_sessions", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ThreadSessionManager {
    /// Create a manager with a fresh in-memory cache.
    pub fn new(assistant: SharedAssistantClient, store: Arc<dyn ThreadStore>) -> Self {
        Self::with_cache(assistant, store, Arc::new(MemorySessionCache::new()))
    }

    /// Create a manager with an injected cache.
    pub fn with_cache(
        assistant: SharedAssistantClient,
        store: Arc<dyn ThreadStore>,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            assistant,
            store,
            cache,
            locks: UserLocks::new(),
        }
    }

    /// The cache tier.
    #[must_use]
    pub fn cache(&self) -> &dyn SessionCache {
        self.cache.as_ref()
    }

    /// Return a session ID usable for one classification turn.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CreationFailed`] if no valid session exists
    /// and the remote assistant refuses to create one.
    pub async fn resolve(&self, user_id: UserId) -> Result<String, SessionError> {
        let _guard = self.locks.lock(user_id).await;

        if let Some(mut cached) = self.cache.get(user_id) {
            if self.is_valid(user_id, &cached.session_id).await {
                debug!(user_id, session_id = %cached.session_id, "reusing cached session");
                self.touch_stored(user_id).await;
                cached.touch();
                let session_id = cached.session_id.clone();
                self.cache.insert(cached);
                return Ok(session_id);
            }

            info!(user_id, session_id = %cached.session_id, "cached session is no longer valid");
            self.cache.remove(user_id);
            self.delete_stored(user_id).await;
        } else if let Some(session_id) = self.restore(user_id).await {
            return Ok(session_id);
        }

        self.create(user_id).await
    }

    /// Drop any cached or stored session for a user.
    ///
    /// Used when a turn discovers that its session vanished remotely after
    /// it was resolved; the next resolve creates a replacement.
    pub async fn forget(&self, user_id: UserId) {
        let _guard = self.locks.lock(user_id).await;
        if let Some(session) = self.cache.remove(user_id) {
            debug!(user_id, session_id = %session.session_id, "forgot cached session");
        }
        self.delete_stored(user_id).await;
    }

    /// Try to bring a stored session back into the cache.
    async fn restore(&self, user_id: UserId) -> Option<String> {
        let stored = match self.store.get(user_id).await {
            Ok(stored) => stored?,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load session from store");
                return None;
            }
        };

        if !self.is_valid(user_id, &stored.session_id).await {
            info!(user_id, session_id = %stored.session_id, "stored session is no longer valid");
            self.delete_stored(user_id).await;
            return None;
        }

        debug!(user_id, session_id = %stored.session_id, "restored session from store");
        self.touch_stored(user_id).await;
        let mut session = stored;
        session.touch();
        let session_id = session.session_id.clone();
        self.cache.insert(session);
        Some(session_id)
    }

    async fn create(&self, user_id: UserId) -> Result<String, SessionError> {
        let session_id = self
            .assistant
            .create_session()
            .await
            .map_err(SessionError::CreationFailed)?;
        info!(user_id, session_id = %session_id, "created session");

        let session = Session::new(user_id, session_id.clone());
        self.cache.insert(session.clone());
        if let Err(e) = self.store.put(&session).await {
            warn!(user_id, session_id = %session_id, error = %e, "failed to save session to store");
        }

        Ok(session_id)
    }

    /// Ask the remote assistant whether a session still exists.
    ///
    /// A validation request that fails outright counts as invalid.
    async fn is_valid(&self, user_id: UserId, session_id: &str) -> bool {
        match self.assistant.session_exists(session_id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(user_id, session_id, error = %e, "failed to validate session");
                false
            }
        }
    }

    async fn touch_stored(&self, user_id: UserId) {
        if let Err(e) = self.store.touch(user_id).await {
            warn!(user_id, error = %e, "failed to update session last used timestamp");
        }
    }

    async fn delete_stored(&self, user_id: UserId) {
        if let Err(e) = self.store.delete(user_id).await {
            warn!(user_id, error = %e, "failed to delete session from store");
        }
    }
}
