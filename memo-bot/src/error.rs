//! Unified error types for memo-bot.
//!
//! Classification itself never fails (the core degrades to a fallback
//! result), so the errors here cover startup: configuration, storage
//! setup, assistant client construction and I/O.

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for memo-bot operations.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Classification core error (assistant client or store setup).
    #[error("memo: {0}")]
    Memo(#[from] memo::Error),

    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Task join error.
    #[error("task: {0}")]
    Task(String),
}

impl BotError {
    /// Create a config error from a string.
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(ConfigError::Invalid(msg.into()))
    }
}

impl From<tokio::task::JoinError> for BotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl From<memo::error::AssistantError> for BotError {
    fn from(err: memo::error::AssistantError) -> Self {
        Self::Memo(err.into())
    }
}

impl From<memo::error::StoreError> for BotError {
    fn from(err: memo::error::StoreError) -> Self {
        Self::Memo(err.into())
    }
}

impl From<memo::error::ConfigError> for BotError {
    fn from(err: memo::error::ConfigError) -> Self {
        Self::Memo(err.into())
    }
}

/// Result type alias for memo-bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing required field.
    #[error("missing: {0}")]
    Missing(String),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a missing field error.
    #[inline]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: BotError = ConfigError::missing("assistant.api_key").into();
        assert!(matches!(err, BotError::Config(_)));
        assert_eq!(err.to_string(), "config: missing: assistant.api_key");

        let err: BotError = memo::error::AssistantError::auth("bad key").into();
        assert!(matches!(err, BotError::Memo(_)));
    }

    #[test]
    fn test_error_helpers() {
        let err = BotError::config("invalid value");
        assert!(matches!(err, BotError::Config(ConfigError::Invalid(_))));
    }
}
