//! Common imports for building a classifier.

pub use crate::assistant::{
    AssistantClient, OpenAIAssistantClient, RunStatus, SharedAssistantClient,
};
pub use crate::classifier::{ClassificationResult, Classifier, FallbackClassifier, Origin};
pub use crate::config::{
    ClassifierConfig, FallbackConfig, FallbackKeywords, FallbackSummary, SessionPolicy,
};
pub use crate::error::{
    AssistantError, AssistantErrorKind, DriverError, Error, Result, SessionError, StoreError,
};
pub use crate::session::{
    FileThreadStore, MemorySessionCache, MemoryThreadStore, Session, SessionCache, ThreadStore,
    UserId,
};

#[cfg(feature = "sqlite")]
pub use crate::session::SqliteThreadStore;
