//! Per-user tag book.
//!
//! Remembers every category and tag a user's notes were classified under,
//! in first-seen order and without duplicates, plus each user's own tag
//! budget.

use std::collections::HashMap;

use memo::{ClassificationResult, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
struct UserTags {
    categories: Vec<String>,
    tags: Vec<String>,
    max_tags: Option<usize>,
}

/// In-memory store of the categories and tags seen for each user.
#[derive(Debug, Default)]
pub struct TagBook {
    users: RwLock<HashMap<UserId, UserTags>>,
}

impl TagBook {
    /// Create an empty tag book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category for a user. Returns `false` if it was already known.
    pub async fn add_category(&self, user_id: UserId, category: &str) -> bool {
        let category = normalize(category);
        if category.is_empty() {
            return false;
        }
        let mut users = self.users.write().await;
        push_unique(&mut users.entry(user_id).or_default().categories, category)
    }

    /// Remove a category for a user. Returns `false` if it was not known.
    pub async fn remove_category(&self, user_id: UserId, category: &str) -> bool {
        let category = normalize(category);
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return false;
        };
        let before = user.categories.len();
        user.categories.retain(|c| *c != category);
        user.categories.len() != before
    }

    /// Set how many tags a user wants per note. Zero is rejected.
    pub async fn set_max_tags(&self, user_id: UserId, max_tags: usize) -> bool {
        if max_tags == 0 {
            return false;
        }
        self.users.write().await.entry(user_id).or_default().max_tags = Some(max_tags);
        true
    }

    /// The user's tag budget, if they set one.
    pub async fn max_tags(&self, user_id: UserId) -> Option<usize> {
        self.users.read().await.get(&user_id).and_then(|u| u.max_tags)
    }

    /// Add a tag for a user. Returns `false` if it was already known.
    pub async fn add_tag(&self, user_id: UserId, tag: &str) -> bool {
        let tag = normalize(tag);
        if tag.is_empty() {
            return false;
        }
        let mut users = self.users.write().await;
        push_unique(&mut users.entry(user_id).or_default().tags, tag)
    }

    /// Record the category and keywords of a classification result.
    pub async fn record(&self, user_id: UserId, result: &ClassificationResult) {
        self.add_category(user_id, &result.category).await;
        for keyword in &result.keywords {
            self.add_tag(user_id, keyword).await;
        }
    }

    /// Categories seen for a user, oldest first.
    pub async fn categories(&self, user_id: UserId) -> Vec<String> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.categories.clone())
            .unwrap_or_default()
    }

    /// Tags seen for a user, oldest first.
    pub async fn tags(&self, user_id: UserId) -> Vec<String> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.tags.clone())
            .unwrap_or_default()
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}
