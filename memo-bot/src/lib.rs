//! Memo Bot - files free-form notes under categories and tags.
//!
//! This crate is the application shell around the [`memo`] classification
//! core: configuration files, thread store selection, bounded concurrent
//! dispatch of inbound notes, reply rendering and the per-user tag book.
//!
//! # Architecture
//!
//! - **Command** ([`command`]) - Chat commands over the tag book
//! - **Config** ([`config`]) - JSON configuration with environment overrides
//! - **Dispatch** ([`dispatch`]) - Bounded pool classifying notes concurrently
//! - **Tags** ([`tags`]) - Categories and tags seen per user
//! - **Format** ([`format`]) - Plain-text and `MarkdownV2` replies
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use memo_bot::prelude::*;
//! use std::sync::Arc;
//!
//! let config = load_config().await?.with_env();
//! let classifier = Classifier::new(
//!     Arc::new(config.build_assistant()?),
//!     config.storage.open()?,
//!     config.classifier.clone(),
//! )?;
//! let dispatcher = Dispatcher::new(Arc::new(classifier), Arc::new(TagBook::new()), 8);
//! let classified = dispatcher.process(InboundNote::new(42, "buy milk #errands")).await;
//! println!("{}", render_reply(&classified.result));
//! ```
//!
//! # Features
//!
//! - `sqlite` (default) - `SQLite` thread store

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod tags;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error types (centralized)
    pub use crate::error::{BotError, ConfigError, ConfigResult, Result};

    // Commands
    pub use crate::command::{CHAT_HELP, ChatCommand};

    // Config
    pub use crate::config::{
        AssistantConfig, BotConfig, ConfigIssue, DispatchConfig, IssueLevel, StorageConfig,
        config_dir, config_path, init_config, load_config, load_config_from, load_or_default,
        save_config, save_config_to,
    };

    // Dispatch
    pub use crate::dispatch::{Classified, Dispatcher, InboundNote};

    // Formatting
    pub use crate::format::{
        escape_markdown, hashtag, render_label_list, render_markdown_reply, render_reply,
    };

    // Tags
    pub use crate::tags::TagBook;

    // Classification core
    pub use memo::{ClassificationResult, Classifier, ClassifierConfig, Origin, UserId};
}
