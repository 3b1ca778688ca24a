//! Local keyword classifier used when the remote assistant is unavailable.

use std::collections::HashSet;

/// Category name → keywords that select it (substring match, lower-cased).
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("work", &["project", "meeting", "deadline", "task", "report"]),
    ("personal", &["family", "friend", "home", "birthday", "holiday"]),
    ("shopping", &["buy", "purchase", "store", "shop", "price"]),
    ("education", &["study", "learn", "course", "book", "homework"]),
    ("travel", &["trip", "flight", "hotel", "vacation", "booking"]),
];

/// Deterministic, network-free tagger.
///
/// Produces hashtags found in the content (in order of appearance, marker
/// stripped, lower-cased) followed by every category whose keyword list has
/// at least one substring hit (in table order). Duplicates are dropped
/// case-insensitively and the result is cut to `max_tags`.
#[derive(Debug, Clone, Copy)]
pub struct FallbackClassifier {
    max_tags: usize,
}

impl FallbackClassifier {
    /// Create a classifier returning at most `max_tags` tags.
    #[must_use]
    pub const fn new(max_tags: usize) -> Self {
        Self { max_tags }
    }

    /// Tag budget.
    #[must_use]
    pub const fn max_tags(&self) -> usize {
        self.max_tags
    }

    /// Tag the content. Empty content yields no tags.
    #[must_use]
    pub fn classify(&self, content: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();

        for word in content.split_whitespace() {
            if let Some(tag) = word.strip_prefix('#') {
                let tag = tag.to_lowercase();
                if !tag.is_empty() && seen.insert(tag.clone()) {
                    tags.push(tag);
                }
            }
        }

        let lowered = content.to_lowercase();
        for (category, keywords) in CATEGORY_KEYWORDS {
            if keywords.iter().any(|k| lowered.contains(k)) && seen.insert((*category).to_string()) {
                tags.push((*category).to_string());
            }
        }

        tags.truncate(self.max_tags);
        tags
    }
}
