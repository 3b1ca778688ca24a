//! Inbound message dispatch.
//!
//! Each inbound note is classified on its own task. A semaphore bounds how
//! many classifications run at once; notes from different users (and
//! concurrent notes from one user) carry no ordering guarantee.

use std::sync::Arc;

use memo::{ClassificationResult, Classifier, UserId};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use crate::tags::TagBook;

/// A note received from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundNote {
    /// Sender.
    pub user_id: UserId,
    /// Note text (or media caption).
    pub content: String,
}

impl InboundNote {
    /// Create a note.
    pub fn new(user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            user_id,
            content: content.into(),
        }
    }
}

/// A note together with its classification.
#[derive(Debug, Clone)]
pub struct Classified {
    /// The original note.
    pub note: InboundNote,
    /// Its classification.
    pub result: ClassificationResult,
}

/// Bounded pool that classifies notes concurrently and records their tags.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    classifier: Arc<Classifier>,
    tags: Arc<TagBook>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Create a dispatcher running at most `max_concurrent` classifications.
    pub fn new(classifier: Arc<Classifier>, tags: Arc<TagBook>, max_concurrent: usize) -> Self {
        Self {
            classifier,
            tags,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            shutdown: CancellationToken::new(),
        }
    }

    /// The per-user tag book fed by this dispatcher.
    #[must_use]
    pub fn tags(&self) -> &Arc<TagBook> {
        &self.tags
    }

    /// Classification slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Classify a note on a new task.
    ///
    /// Returns immediately; the task waits for a free slot.
    pub fn dispatch(&self, note: InboundNote) -> JoinHandle<Classified> {
        let this = self.clone();
        let span = info_span!("dispatch", user_id = note.user_id);
        tokio::spawn(async move { this.process(note).await }.instrument(span))
    }

    /// Classify a note on the current task, honoring the concurrency bound
    /// and the user's own tag budget.
    pub async fn process(&self, note: InboundNote) -> Classified {
        // The semaphore is never closed.
        let _permit = Arc::clone(&self.permits).acquire_owned().await.ok();
        debug!(available = self.available(), "classification slot acquired");

        let mut result = self
            .classifier
            .classify_with_cancel(note.user_id, &note.content, &self.shutdown.child_token())
            .await;
        if let Some(max_tags) = self.tags.max_tags(note.user_id).await {
            result.keywords.truncate(max_tags);
        }
        self.tags.record(note.user_id, &result).await;

        Classified { note, result }
    }

    /// Cancel every in-flight classification. Cancelled notes still receive
    /// a fallback result.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memo::assistant::{AssistantClient, RunStatus};
    use memo::config::SessionPolicy;
    use memo::error::{AssistantError, AssistantResult};
    use memo::session::MemoryThreadStore;
    use memo::{ClassifierConfig, Origin};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Creates sessions slowly, then fails every turn.
    #[derive(Debug, Default)]
    struct SlowAssistant {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl AssistantClient for SlowAssistant {
        async fn create_session(&self) -> AssistantResult<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(AssistantError::network("unreachable"))
        }

        async fn session_exists(&self, _: &str) -> AssistantResult<bool> {
            Ok(false)
        }

        async fn post_message(&self, _: &str, _: &str) -> AssistantResult<()> {
            Ok(())
        }

        async fn submit_run(&self, _: &str) -> AssistantResult<String> {
            Ok("run_1".into())
        }

        async fn run_status(&self, _: &str, _: &str) -> AssistantResult<RunStatus> {
            Ok(RunStatus::Failed)
        }

        async fn latest_reply(&self, _: &str) -> AssistantResult<Option<String>> {
            Ok(None)
        }

        async fn delete_session(&self, _: &str) -> AssistantResult<()> {
            Ok(())
        }
    }

    fn dispatcher(assistant: Arc<SlowAssistant>, max_concurrent: usize) -> Dispatcher {
        let config = ClassifierConfig::new().session_policy(SessionPolicy::Disposable);
        let classifier =
            Classifier::new(assistant, Arc::new(MemoryThreadStore::new()), config).unwrap();
        Dispatcher::new(Arc::new(classifier), Arc::new(TagBook::new()), max_concurrent)
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let assistant = Arc::new(SlowAssistant::default());
        let dispatcher = dispatcher(Arc::clone(&assistant), 2);

        let handles: Vec<_> = (0..6)
            .map(|i| dispatcher.dispatch(InboundNote::new(i, "buy milk")))
            .collect();
        for handle in handles {
            let classified = handle.await.unwrap();
            assert_eq!(classified.result.origin, Origin::Fallback);
        }

        assert_eq!(assistant.peak.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.available(), 2);
    }

    #[tokio::test]
    async fn test_results_feed_tag_book() {
        let dispatcher = dispatcher(Arc::new(SlowAssistant::default()), 4);

        dispatcher
            .process(InboundNote::new(5, "project meeting #q3"))
            .await;

        assert_eq!(dispatcher.tags().categories(5).await, vec!["general"]);
        assert_eq!(dispatcher.tags().tags(5).await, vec!["q3", "work"]);
    }

    #[tokio::test]
    async fn test_user_tag_budget_limits_keywords() {
        let dispatcher = dispatcher(Arc::new(SlowAssistant::default()), 4);
        dispatcher.tags().set_max_tags(5, 2).await;

        let classified = dispatcher
            .process(InboundNote::new(5, "project meeting #q3 #budget #team"))
            .await;

        assert_eq!(classified.result.keywords, vec!["q3", "budget"]);
        assert_eq!(dispatcher.tags().tags(5).await, vec!["q3", "budget"]);

        let other = dispatcher
            .process(InboundNote::new(6, "project meeting #q3 #budget #team"))
            .await;
        assert_eq!(other.result.keywords, vec!["q3", "budget", "team", "work"]);
    }
}
