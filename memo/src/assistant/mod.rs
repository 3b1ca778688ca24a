//! Remote assistant client abstraction.
//!
//! The classification core never talks to a vendor SDK directly. It drives
//! the thread/message/run primitives of a conversational assistant through
//! the [`AssistantClient`] trait, so tests can substitute a scripted client
//! and deployments can point at any Assistants-compatible endpoint.
//!
//! - [`AssistantClient`] - The consumed capability
//! - [`RunStatus`] - Remote run lifecycle states
//! - [`OpenAIAssistantClient`] - HTTP implementation for the Assistants v2 API

mod openai;

pub use openai::{OPENAI_API_BASE_URL, OpenAIAssistantClient, OpenAIAssistantClientBuilder};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AssistantResult;

/// Status of an asynchronous assistant run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, waiting to be picked up.
    Queued,
    /// Being processed.
    InProgress,
    /// Cancellation requested but not yet effective.
    Cancelling,
    /// Finished successfully; a reply is available.
    Completed,
    /// Finished with an error.
    Failed,
    /// Exceeded the remote side's own time limit.
    Expired,
    /// Cancelled on the remote side.
    Cancelled,
    /// The assistant wants tool output, which this core never provides.
    RequiresAction,
    /// Ended before producing a complete reply.
    Incomplete,
}

impl RunStatus {
    /// Returns `true` once the run will no longer change state on its own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }

    /// Returns `true` for the only terminal status that yields a reply.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::RequiresAction => "requires_action",
            Self::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread, message and run primitives of a remote conversational assistant.
///
/// A "session" here is the remote thread: an opaque identifier issued by the
/// assistant that accumulates messages across runs.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Create a new remote session and return its identifier.
    async fn create_session(&self) -> AssistantResult<String>;

    /// Check whether a session still exists on the remote side.
    ///
    /// A missing session is `Ok(false)`; transport failures are errors.
    async fn session_exists(&self, session_id: &str) -> AssistantResult<bool>;

    /// Append a user message to the session.
    async fn post_message(&self, session_id: &str, text: &str) -> AssistantResult<()>;

    /// Ask the assistant to process the session and return the run identifier.
    async fn submit_run(&self, session_id: &str) -> AssistantResult<String>;

    /// Fetch the current status of a run.
    async fn run_status(&self, session_id: &str, run_id: &str) -> AssistantResult<RunStatus>;

    /// Fetch the text of the most recent assistant-authored message, if any.
    async fn latest_reply(&self, session_id: &str) -> AssistantResult<Option<String>>;

    /// Delete a session on the remote side.
    async fn delete_session(&self, session_id: &str) -> AssistantResult<()>;
}

/// A shared, reference-counted assistant client for use across tasks.
pub type SharedAssistantClient = Arc<dyn AssistantClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(!RunStatus::Cancelling.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Expired.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::RequiresAction.is_terminal());
    }

    #[test]
    fn test_run_status_wire_names() {
        let status: RunStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, RunStatus::InProgress);
        assert_eq!(RunStatus::RequiresAction.to_string(), "requires_action");
        assert!(RunStatus::Completed.is_success());
        assert!(!RunStatus::Incomplete.is_success());
    }
}
