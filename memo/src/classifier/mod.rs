//! Message classification.
//!
//! - [`Classifier`] - Public entry point; never fails, degrades instead
//! - [`FallbackClassifier`] - Local deterministic tagger
//! - [`ClassificationResult`] - Output of one classification turn

mod fallback;
mod orchestrator;

pub use fallback::{CATEGORY_KEYWORDS, FallbackClassifier};
pub use orchestrator::{Classifier, FALLBACK_APOLOGY, FALLBACK_CATEGORY, UNCLASSIFIED_KEYWORD};

use crate::error::DriverError;
use serde::{Deserialize, Serialize};

/// Where a classification result came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Parsed from the remote assistant's reply.
    #[default]
    Assistant,
    /// Produced locally after the remote path failed.
    Fallback,
}

/// Result of one classification turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Single category label.
    pub category: String,
    /// Ordered keywords, bounded by the configured tag budget.
    pub keywords: Vec<String>,
    /// Free-text summary.
    pub summary: String,
    /// Assistant notes about captioned media, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attachments_analysis: String,
    /// URLs the assistant extracted from the content.
    pub links: Vec<String>,
    /// Whether the result came from the assistant or the local fallback.
    #[serde(default)]
    pub origin: Origin,
}

impl ClassificationResult {
    /// Parse the assistant's reply text.
    ///
    /// The reply must be a single JSON object. Missing or `null` fields are
    /// treated as empty; unknown fields are ignored; anything else is a
    /// parse failure.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Parse`] if the text is not such an object and
    /// [`DriverError::MissingCategory`] if the category is blank.
    pub fn from_reply(text: &str) -> Result<Self, DriverError> {
        let reply: ReplyDocument = serde_json::from_str(text)?;
        let category = reply.category.unwrap_or_default();
        if category.trim().is_empty() {
            return Err(DriverError::MissingCategory);
        }

        Ok(Self {
            category,
            keywords: reply.keywords.unwrap_or_default(),
            summary: reply.summary.unwrap_or_default(),
            attachments_analysis: reply.attachments_analysis.unwrap_or_default(),
            links: reply.links.unwrap_or_default(),
            origin: Origin::Assistant,
        })
    }

    /// Returns `true` if this result was produced by the local fallback.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.origin == Origin::Fallback
    }

    /// Lower-cased category followed by the keywords, cut to `max_tags`.
    #[must_use]
    pub fn tags(&self, max_tags: usize) -> Vec<String> {
        std::iter::once(self.category.to_lowercase())
            .chain(self.keywords.iter().cloned())
            .take(max_tags)
            .collect()
    }
}

/// JSON document the assistant is instructed to reply with.
#[derive(Debug, Deserialize)]
struct ReplyDocument {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    attachments_analysis: Option<String>,
    #[serde(default)]
    links: Option<Vec<String>>,
}
