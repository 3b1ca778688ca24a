//! Classifier configuration.
//!
//! All fields have serde defaults, so a partial JSON/TOML document (or an
//! empty one) deserializes into a working configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How remote sessions are used across turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Keep one session per user across turns (conversational continuity).
    #[default]
    Reuse,
    /// Create a fresh session for every turn and delete it afterwards.
    Disposable,
}

/// Which keywords a fallback result carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKeywords {
    /// Tags from the local heuristic classifier, or `unclassified` if none.
    #[default]
    Heuristic,
    /// Always the single keyword `unclassified`.
    Unclassified,
}

/// Which summary a fallback result carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackSummary {
    /// A fixed apology.
    #[default]
    Apology,
    /// The original content, unchanged.
    Echo,
}

/// Shape of the result returned when the remote path fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Keyword policy.
    pub keywords: FallbackKeywords,
    /// Summary policy.
    pub summary: FallbackSummary,
}

/// Configuration for the classification core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum number of tags per message.
    pub max_tags: usize,
    /// Session lifetime policy.
    pub session_policy: SessionPolicy,
    /// Delay between run status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on a whole turn (session setup included), in whole
    /// seconds. `None` waits forever.
    pub max_wait_secs: Option<u64>,
    /// Run turns for the same user one at a time when sessions are reused.
    pub serialize_user_turns: bool,
    /// Fallback result policy.
    pub fallback: FallbackConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_tags: 5,
            session_policy: SessionPolicy::Reuse,
            poll_interval_ms: 500,
            max_wait_secs: Some(60),
            serialize_user_turns: true,
            fallback: FallbackConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of tags.
    #[must_use]
    pub const fn max_tags(mut self, max_tags: usize) -> Self {
        self.max_tags = max_tags;
        self
    }

    /// Set the session policy.
    #[must_use]
    pub const fn session_policy(mut self, policy: SessionPolicy) -> Self {
        self.session_policy = policy;
        self
    }

    /// Set the poll interval, rounded up to whole milliseconds.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_nanos().div_ceil(1_000_000))
            .unwrap_or(u64::MAX);
        self
    }

    /// Set the turn deadline, rounded up to whole seconds. `None` disables it.
    #[must_use]
    pub fn max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait_secs =
            max_wait.map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0));
        self
    }

    /// Set whether same-user turns are serialized.
    #[must_use]
    pub const fn serialize_user_turns(mut self, serialize: bool) -> Self {
        self.serialize_user_turns = serialize;
        self
    }

    /// Set the fallback policy.
    #[must_use]
    pub const fn fallback(mut self, fallback: FallbackConfig) -> Self {
        self.fallback = fallback;
        self
    }

    /// Delay between run status polls.
    #[must_use]
    pub const fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Run deadline, if any.
    #[must_use]
    pub const fn max_wait_duration(&self) -> Option<Duration> {
        match self.max_wait_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }

    /// Check the configuration for values the core cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero tag budget, a zero poll
    /// interval or a zero deadline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tags == 0 {
            return Err(ConfigError::invalid("max_tags must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms must be positive"));
        }
        if self.max_wait_secs == Some(0) {
            return Err(ConfigError::invalid(
                "max_wait_secs must be positive (use null to wait without limit)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.max_tags, 5);
        assert_eq!(config.session_policy, SessionPolicy::Reuse);
        assert_eq!(config.poll_interval_duration(), Duration::from_millis(500));
        assert_eq!(config.max_wait_duration(), Some(Duration::from_secs(60)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config: ClassifierConfig = serde_json::from_str(
            r#"{"max_tags": 3, "session_policy": "disposable", "max_wait_secs": null,
                "fallback": {"summary": "echo"}}"#,
        )
        .unwrap();
        assert_eq!(config.max_tags, 3);
        assert_eq!(config.session_policy, SessionPolicy::Disposable);
        assert_eq!(config.max_wait_duration(), None);
        assert_eq!(config.fallback.summary, FallbackSummary::Echo);
        assert_eq!(config.fallback.keywords, FallbackKeywords::Heuristic);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(ClassifierConfig::new().max_tags(0).validate().is_err());
        assert!(
            ClassifierConfig::new()
                .poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            ClassifierConfig::new()
                .max_wait(Some(Duration::ZERO))
                .validate()
                .is_err()
        );
        assert!(ClassifierConfig::new().max_wait(None).validate().is_ok());
    }

    #[test]
    fn test_duration_setters_round_up() {
        let config = ClassifierConfig::new()
            .poll_interval(Duration::from_micros(1500))
            .max_wait(Some(Duration::from_millis(1500)));
        assert_eq!(config.poll_interval_ms, 2);
        assert_eq!(config.max_wait_secs, Some(2));

        let config = ClassifierConfig::new().max_wait(Some(Duration::from_millis(500)));
        assert_eq!(config.max_wait_duration(), Some(Duration::from_secs(1)));
        assert!(config.validate().is_ok());

        let config = ClassifierConfig::new()
            .poll_interval(Duration::from_millis(250))
            .max_wait(Some(Duration::from_secs(30)));
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.max_wait_secs, Some(30));
    }
}
