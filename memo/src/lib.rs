#![cfg_attr(docsrs, feature(doc_cfg))]
//! Memo is the classification session core of the memo bot.
//!
//! It turns free-form user content into a category, a bounded set of tags
//! and a summary by running one turn against a remote conversational
//! assistant, and degrades to a local keyword classifier when any remote
//! step fails.
//!
//! - [`Classifier`] - Entry point; `classify` and `tags_for` never fail
//! - [`session::ThreadSessionManager`] - One valid remote session per user,
//!   reconciled across a cache and a durable [`session::ThreadStore`]
//! - [`run::RunDriver`] - Post, submit, poll and parse one turn, with a
//!   deadline and caller cancellation
//! - [`assistant::AssistantClient`] - Remote contract, with an
//!   [`OpenAIAssistantClient`] implementation
//!
//! # Features
//!
//! - `sqlite` - [`session::SqliteThreadStore`] backed by `rusqlite`

pub mod assistant;
pub mod classifier;
pub mod config;
pub mod error;
pub mod prelude;
pub mod run;
pub mod session;

pub use assistant::{AssistantClient, OpenAIAssistantClient, RunStatus, SharedAssistantClient};
pub use classifier::{ClassificationResult, Classifier, FallbackClassifier, Origin};
pub use config::ClassifierConfig;
pub use error::{Error, Result};
pub use session::{Session, UserId};
