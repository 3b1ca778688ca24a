//! Bot configuration.
//!
//! Stored as JSON at `~/.memo-bot/config.json`. Every section has defaults,
//! so a partial file is valid. Credentials are usually supplied through the
//! environment instead of the file:
//!
//! | Variable              | Overrides                |
//! |-----------------------|--------------------------|
//! | `OPENAI_API_KEY`      | `assistant.api_key`      |
//! | `OPENAI_ASSISTANT_ID` | `assistant.assistant_id` |
//! | `OPENAI_BASE_URL`     | `assistant.base_url`     |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use memo::assistant::{OPENAI_API_BASE_URL, OpenAIAssistantClient};
use memo::error::AssistantResult;
use memo::session::{FileThreadStore, MemoryThreadStore, ThreadStore};
use memo::ClassifierConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Name of the directory under the home directory holding bot state.
pub const CONFIG_DIR_NAME: &str = ".memo-bot";

/// Top-level bot configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Remote assistant connection.
    pub assistant: AssistantConfig,
    /// Classification core settings.
    pub classifier: ClassifierConfig,
    /// Durable thread store.
    pub storage: StorageConfig,
    /// Inbound message dispatch.
    pub dispatch: DispatchConfig,
}

/// Remote assistant connection settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Identifier of the configured assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: OPENAI_API_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Durable thread store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local; sessions are lost on restart.
    Memory,
    /// One JSON file per user in a directory.
    File {
        /// Directory holding the session files.
        path: PathBuf,
    },
    /// `SQLite` database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::File {
            path: config_dir().join("threads"),
        }
    }
}

impl StorageConfig {
    /// Short backend name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Sqlite { .. } => "sqlite",
        }
    }

    /// Open the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or was not compiled
    /// in.
    pub fn open(&self) -> crate::error::Result<Arc<dyn ThreadStore>> {
        debug!(kind = self.kind(), "opening thread store");
        match self {
            Self::Memory => Ok(Arc::new(MemoryThreadStore::new())),
            Self::File { path } => Ok(Arc::new(FileThreadStore::new(path))),
            #[cfg(feature = "sqlite")]
            Self::Sqlite { path } => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Arc::new(memo::session::SqliteThreadStore::open(path)?))
            }
            #[cfg(not(feature = "sqlite"))]
            Self::Sqlite { .. } => Err(ConfigError::invalid(
                "storage kind 'sqlite' requires the `sqlite` feature",
            )
            .into()),
        }
    }
}

/// Inbound message dispatch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of messages classified at once.
    pub max_concurrent: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_concurrent: 8 }
    }
}

/// Severity of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// Usable, but probably not what was intended.
    Warning,
    /// The bot cannot run with this configuration.
    Error,
}

/// A problem found by [`BotConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Severity.
    pub level: IssueLevel,
    /// Human-readable description.
    pub message: String,
}

impl ConfigIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            IssueLevel::Warning => write!(f, "warning: {}", self.message),
            IssueLevel::Error => write!(f, "error: {}", self.message),
        }
    }
}

impl BotConfig {
    /// Apply `OPENAI_*` environment overrides.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.assistant.api_key = Some(key);
        }
        if let Some(id) = non_empty("OPENAI_ASSISTANT_ID") {
            self.assistant.assistant_id = Some(id);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.assistant.base_url = url;
        }
        self
    }

    /// Check the configuration and report every problem found.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.assistant.api_key.as_deref().is_none_or(str::is_empty) {
            issues.push(ConfigIssue::error(
                "assistant.api_key is not set (or set OPENAI_API_KEY)",
            ));
        }
        if self.assistant.assistant_id.as_deref().is_none_or(str::is_empty) {
            issues.push(ConfigIssue::error(
                "assistant.assistant_id is not set (or set OPENAI_ASSISTANT_ID)",
            ));
        }
        if !self.assistant.base_url.starts_with("http://")
            && !self.assistant.base_url.starts_with("https://")
        {
            issues.push(ConfigIssue::error(format!(
                "assistant.base_url is not an http(s) URL: {}",
                self.assistant.base_url
            )));
        }
        if self.assistant.timeout_secs == 0 {
            issues.push(ConfigIssue::warning(
                "assistant.timeout_secs is 0; requests will never time out",
            ));
        }

        if let Err(e) = self.classifier.validate() {
            issues.push(ConfigIssue::error(format!("classifier: {e}")));
        }
        if self.classifier.max_wait_secs.is_none() {
            issues.push(ConfigIssue::warning(
                "classifier.max_wait_secs is null; a stuck run will be polled forever",
            ));
        }

        if self.dispatch.max_concurrent == 0 {
            issues.push(ConfigIssue::error("dispatch.max_concurrent must be at least 1"));
        }

        if matches!(self.storage, StorageConfig::Memory) {
            issues.push(ConfigIssue::warning(
                "storage.kind is memory; sessions are lost on restart",
            ));
        }
        #[cfg(not(feature = "sqlite"))]
        if matches!(self.storage, StorageConfig::Sqlite { .. }) {
            issues.push(ConfigIssue::error(
                "storage.kind is sqlite but this build lacks the `sqlite` feature",
            ));
        }

        issues
    }

    /// Returns `true` if [`validate`](Self::validate) reports no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|issue| issue.level != IssueLevel::Error)
    }

    /// Build the assistant client described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if credentials are missing.
    pub fn build_assistant(&self) -> AssistantResult<OpenAIAssistantClient> {
        let mut builder = OpenAIAssistantClient::builder()
            .api_key(self.assistant.api_key.clone().unwrap_or_default())
            .assistant_id(self.assistant.assistant_id.clone().unwrap_or_default())
            .base_url(&self.assistant.base_url);
        if self.assistant.timeout_secs > 0 {
            builder = builder.timeout_secs(self.assistant.timeout_secs);
        }
        builder.build()
    }
}

/// Directory holding bot state (`~/.memo-bot`).
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Default configuration file path.
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load the configuration from the default path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_config() -> ConfigResult<BotConfig> {
    load_config_from(&config_path()).await
}

/// Load the configuration from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_config_from(path: &Path) -> ConfigResult<BotConfig> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Load the configuration from `path`, or defaults if the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_or_default(path: &Path) -> ConfigResult<BotConfig> {
    match load_config_from(path).await {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(BotConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Save the configuration to the default path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_config(config: &BotConfig) -> ConfigResult<()> {
    save_config_to(config, &config_path()).await
}

/// Save the configuration to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_config_to(config: &BotConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Write a default configuration to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn init_config(path: &Path) -> ConfigResult<BotConfig> {
    let config = BotConfig::default();
    save_config_to(&config, path).await?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[test]
    fn test_partial_document() {
        let config: BotConfig = serde_json::from_str(
            r#"{
                "assistant": {"assistant_id": "asst_1"},
                "classifier": {"max_tags": 3},
                "storage": {"kind": "sqlite", "path": "/tmp/memo.db"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.assistant.assistant_id.as_deref(), Some("asst_1"));
        assert_eq!(config.assistant.base_url, OPENAI_API_BASE_URL);
        assert_eq!(config.classifier.max_tags, 3);
        assert_eq!(config.classifier.poll_interval_ms, 500);
        assert_eq!(config.storage.kind(), "sqlite");
        assert_eq!(config.dispatch.max_concurrent, 8);
    }

    #[test]
    fn test_env_overrides() {
        let config = BotConfig::default().with_overrides(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "OPENAI_ASSISTANT_ID" => Some("asst_env".into()),
            "OPENAI_BASE_URL" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.assistant.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.assistant.assistant_id.as_deref(), Some("asst_env"));
        assert_eq!(config.assistant.base_url, OPENAI_API_BASE_URL);
    }

    #[test]
    fn test_validate_reports_missing_credentials() {
        let issues = BotConfig::default().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|i| i.level == IssueLevel::Error)
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(!BotConfig::default().is_valid());
    }

    #[test]
    fn test_validate_complete_config() {
        let mut config = BotConfig::default();
        config.assistant.api_key = Some("sk-test".into());
        config.assistant.assistant_id = Some("asst_1".into());
        assert!(config.validate().is_empty());
        assert!(config.is_valid());

        config.dispatch.max_concurrent = 0;
        config.classifier.max_tags = 0;
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].to_string().starts_with("error: classifier"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = AssistantConfig::default();
        config.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_build_assistant_requires_credentials() {
        assert!(BotConfig::default().build_assistant().is_err());

        let config = BotConfig::default().with_overrides(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "OPENAI_ASSISTANT_ID" => Some("asst_1".into()),
            _ => None,
        });
        assert!(config.build_assistant().is_ok());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = init_config(&path).await.unwrap();
        config.storage = StorageConfig::Memory;
        config.dispatch.max_concurrent = 2;
        save_config_to(&config, &path).await.unwrap();

        let loaded = load_config_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(load_or_default(&missing).await.unwrap(), BotConfig::default());

        let broken = dir.path().join("broken.json");
        tokio::fs::write(&broken, "{ nope").await.unwrap();
        assert!(matches!(
            load_or_default(&broken).await,
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_open_file_store() {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig::File {
            path: dir.path().join("threads"),
        };
        let store = storage.open().unwrap();
        assert!(store.get(1).await.unwrap().is_none());
    }
}
