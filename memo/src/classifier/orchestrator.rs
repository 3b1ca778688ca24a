//! Classification orchestrator: the public, infallible entry point.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::fallback::FallbackClassifier;
use super::{ClassificationResult, Origin};
use crate::assistant::SharedAssistantClient;
use crate::config::{ClassifierConfig, FallbackKeywords, FallbackSummary, SessionPolicy};
use crate::error::{ConfigError, DriverError, Error, Result, SessionError};
use crate::run::RunDriver;
use crate::session::{
    MemorySessionCache, SessionCache, ThreadSessionManager, ThreadStore, UserId, UserLocks,
};

/// Category of every fallback result.
pub const FALLBACK_CATEGORY: &str = "general";

/// Keyword used when no better fallback tag exists.
pub const UNCLASSIFIED_KEYWORD: &str = "unclassified";

/// Summary of a fallback result under the apology policy.
pub const FALLBACK_APOLOGY: &str =
    "I received your message but I'm having trouble analyzing it right now.";

/// Classifies user content through the remote assistant, falling back to
/// local heuristics whenever any remote step fails.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use memo::prelude::*;
///
/// let assistant = OpenAIAssistantClient::builder()
///     .api_key(std::env::var("OPENAI_API_KEY")?)
///     .assistant_id("asst_123")
///     .build()?;
/// let classifier = Classifier::new(
///     Arc::new(assistant),
///     Arc::new(MemoryThreadStore::new()),
///     ClassifierConfig::default(),
/// )?;
///
/// let result = classifier.classify(42, "buy milk #errands").await;
/// println!("{} {:?}", result.category, result.keywords);
/// ```
pub struct Classifier {
    assistant: SharedAssistantClient,
    sessions: ThreadSessionManager,
    driver: RunDriver,
    fallback: FallbackClassifier,
    config: ClassifierConfig,
    turns: UserLocks,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Create a classifier with an in-memory session cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is unusable.
    pub fn new(
        assistant: SharedAssistantClient,
        store: Arc<dyn ThreadStore>,
        config: ClassifierConfig,
    ) -> std::result::Result<Self, ConfigError> {
        Self::with_cache(assistant, store, Arc::new(MemorySessionCache::new()), config)
    }

    /// Create a classifier with an injected session cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is unusable.
    pub fn with_cache(
        assistant: SharedAssistantClient,
        store: Arc<dyn ThreadStore>,
        cache: Arc<dyn SessionCache>,
        config: ClassifierConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let driver = RunDriver::new(
            Arc::clone(&assistant),
            config.poll_interval_duration(),
            config.max_wait_duration(),
        );
        Ok(Self {
            sessions: ThreadSessionManager::with_cache(Arc::clone(&assistant), store, cache),
            assistant,
            driver,
            fallback: FallbackClassifier::new(config.max_tags),
            config,
            turns: UserLocks::new(),
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Session manager used in `reuse` mode.
    #[must_use]
    pub const fn sessions(&self) -> &ThreadSessionManager {
        &self.sessions
    }

    /// Classify `content` for `user_id`. Never fails.
    pub async fn classify(&self, user_id: UserId, content: &str) -> ClassificationResult {
        self.classify_with_cancel(user_id, content, &CancellationToken::new())
            .await
    }

    /// Classify `content`, aborting the remote turn when `cancel` fires.
    ///
    /// A cancelled turn degrades to the fallback result like any other
    /// remote failure.
    pub async fn classify_with_cancel(
        &self,
        user_id: UserId,
        content: &str,
        cancel: &CancellationToken,
    ) -> ClassificationResult {
        let span = info_span!("classify", user_id);
        async move {
            info!(policy = ?self.config.session_policy, "classifying message");
            match self.remote(user_id, content, cancel).await {
                Ok(mut result) => {
                    result.keywords.truncate(self.config.max_tags);
                    info!(
                        category = %result.category,
                        keywords = result.keywords.len(),
                        "message classified"
                    );
                    result
                }
                Err(e) => {
                    error!(error = %e, "remote classification failed, using fallback");
                    self.fallback_result(content)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Lower-cased category followed by keywords, at most `max_tags` long.
    pub async fn tags_for(&self, user_id: UserId, content: &str) -> Vec<String> {
        self.classify(user_id, content)
            .await
            .tags(self.config.max_tags)
    }

    async fn remote(
        &self,
        user_id: UserId,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult> {
        match self.config.session_policy {
            SessionPolicy::Disposable => {
                let deadline = self.driver.deadline();
                let session_id = self
                    .driver
                    .interruptible(cancel, deadline, self.assistant.create_session())
                    .await?
                    .map_err(SessionError::CreationFailed)?;
                debug!(session_id = %session_id, "created disposable session");
                Ok(self
                    .driver
                    .execute_until(&session_id, content, true, cancel, deadline)
                    .await?)
            }
            SessionPolicy::Reuse => {
                let _turn = if self.config.serialize_user_turns {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(DriverError::Cancelled.into()),
                        guard = self.turns.lock(user_id) => Some(guard),
                    }
                } else {
                    None
                };

                // Time spent queued behind the same user's turns is not charged.
                let deadline = self.driver.deadline();
                let session_id = self
                    .driver
                    .interruptible(cancel, deadline, self.sessions.resolve(user_id))
                    .await??;
                match self
                    .driver
                    .execute_until(&session_id, content, false, cancel, deadline)
                    .await
                {
                    Ok(result) => Ok(result),
                    Err(DriverError::PostMessage(e)) if e.is_not_found() => {
                        self.sessions.forget(user_id).await;
                        Err(Error::Driver(DriverError::PostMessage(e)))
                    }
                    Err(e) if e.is_interrupted() => {
                        // The abandoned run may still be active on the session.
                        warn!(session_id = %session_id, "turn interrupted, abandoning session");
                        self.sessions.forget(user_id).await;
                        Err(e.into())
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn fallback_result(&self, content: &str) -> ClassificationResult {
        let keywords = match self.config.fallback.keywords {
            FallbackKeywords::Heuristic => {
                let tags = self.fallback.classify(content);
                if tags.is_empty() {
                    vec![UNCLASSIFIED_KEYWORD.to_string()]
                } else {
                    tags
                }
            }
            FallbackKeywords::Unclassified => vec![UNCLASSIFIED_KEYWORD.to_string()],
        };
        let summary = match self.config.fallback.summary {
            FallbackSummary::Apology => FALLBACK_APOLOGY.to_string(),
            FallbackSummary::Echo => content.to_string(),
        };

        ClassificationResult {
            category: FALLBACK_CATEGORY.to_string(),
            keywords,
            summary,
            attachments_analysis: String::new(),
            links: Vec::new(),
            origin: Origin::Fallback,
        }
    }
}
