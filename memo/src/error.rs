//! Unified error types for the memo classification core.
//!
//! This module provides the error hierarchy covering:
//! - Remote assistant failures (authentication, rate limiting, missing threads)
//! - Session resolution failures
//! - Run driver failures (one variant per protocol step)
//! - Durable thread store failures
//!
//! None of these ever escape [`Classifier::classify`](crate::Classifier::classify),
//! which downgrades them into a fallback result. They are public so that the
//! lower-level components can be used and tested on their own.

use std::fmt;
use std::time::Duration;

use crate::assistant::RunStatus;

/// Result type alias for memo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the memo crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Remote assistant error.
    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    /// Session could not be resolved.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A classification turn failed.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Durable thread store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// ============================================================================
// Assistant Errors
// ============================================================================

/// Error type for remote assistant operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AssistantError {
    /// The error kind.
    pub kind: AssistantErrorKind,
    /// Additional error message.
    pub message: String,
    /// Optional error code reported by the provider.
    pub code: Option<String>,
}

/// Categories of assistant errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssistantErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// Rate limit or quota exceeded.
    RateLimited,
    /// The addressed thread or run does not exist.
    NotFound,
    /// Network or connection error.
    Network,
    /// Unexpected HTTP status.
    HttpStatus,
    /// The response body did not have the expected shape.
    ResponseFormat,
    /// Provider-specific error.
    Provider,
}

impl AssistantError {
    fn with_kind(kind: AssistantErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::with_kind(AssistantErrorKind::Auth, message)
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_kind(AssistantErrorKind::RateLimited, message)
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(AssistantErrorKind::NotFound, message)
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::with_kind(AssistantErrorKind::Network, message)
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: AssistantErrorKind::HttpStatus,
            message: format!("HTTP {status}: {}", body.into()),
            code: Some(status.to_string()),
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::with_kind(
            AssistantErrorKind::ResponseFormat,
            format!("Expected {}, got {}", expected.into(), got.into()),
        )
    }

    /// Create a provider-specific error.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::with_kind(AssistantErrorKind::Provider, message)
    }

    /// Attach a provider error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Check if the remote reported the addressed resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == AssistantErrorKind::NotFound
    }
}

impl fmt::Display for AssistantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssistantError {}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::response_format("JSON body", err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

/// Result type for assistant operations.
pub type AssistantResult<T> = std::result::Result<T, AssistantError>;

// ============================================================================
// Session Errors
// ============================================================================

/// Error type for session resolution.
///
/// Invalid sessions are not represented here: the session manager discards
/// them and creates a replacement instead of failing.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The remote assistant refused to create a new session.
    #[error("session creation failed: {0}")]
    CreationFailed(#[source] AssistantError),
}

// ============================================================================
// Driver Errors
// ============================================================================

/// Error type for a single classification turn.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DriverError {
    /// Posting the user's content to the session failed.
    #[error("failed to post message: {0}")]
    PostMessage(#[source] AssistantError),

    /// Submitting the run failed.
    #[error("failed to submit run: {0}")]
    SubmitRun(#[source] AssistantError),

    /// Polling the run status failed.
    #[error("failed to retrieve run: {0}")]
    RetrieveRun(#[source] AssistantError),

    /// The run reached a terminal status other than `completed`.
    #[error("run ended with status {0}")]
    RunEnded(RunStatus),

    /// Listing the session messages failed.
    #[error("failed to fetch reply: {0}")]
    FetchReply(#[source] AssistantError),

    /// The run completed without an assistant-authored message.
    #[error("no assistant reply found")]
    NoReply,

    /// The assistant reply was not the expected JSON document.
    #[error("failed to parse assistant reply: {0}")]
    Parse(#[from] serde_json::Error),

    /// The reply parsed but carried no category.
    #[error("assistant reply has no category")]
    MissingCategory,

    /// The run did not finish within the configured deadline.
    #[error("run did not finish within {0:?}")]
    TimedOut(Duration),

    /// The caller cancelled the turn.
    #[error("turn cancelled")]
    Cancelled,
}

impl DriverError {
    /// Returns `true` if the turn ended because of the local deadline or
    /// caller cancellation rather than a remote failure.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::TimedOut(_) | Self::Cancelled)
    }
}

// ============================================================================
// Store Errors
// ============================================================================

/// Error type for durable thread store operations.
///
/// Always non-fatal inside the session manager: the cache is authoritative
/// for the current call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The storage backend encountered an error.
    #[error("[{backend}] {message}")]
    Backend {
        /// Backend identifier (e.g., `"sqlite"`).
        backend: &'static str,
        /// Human-readable error description.
        message: String,
    },

    /// Failed to acquire a lock (poisoned by a panic).
    #[error("lock error: {0}")]
    Lock(String),

    /// A blocking task failed to join.
    #[error("task error: {0}")]
    Task(String),
}

impl StoreError {
    /// Creates a [`Backend`](Self::Backend) error for the given backend.
    #[must_use]
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::backend("sqlite", e.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
