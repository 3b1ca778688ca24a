//! Reply rendering.

use memo::ClassificationResult;

/// Characters that must be escaped in Telegram `MarkdownV2` text.
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Turn a label into a hashtag body: lower-cased, spaces replaced by `_`.
#[must_use]
pub fn hashtag(label: &str) -> String {
    format!("#{}", label.trim().replace(' ', "_").to_lowercase())
}

/// Render a classification result as a plain-text reply.
///
/// ```text
/// <summary>
///
/// Category: #work
/// Tags: #q3 #budget
///
/// Links found:
/// • https://example.com
/// ```
#[must_use]
pub fn render_reply(result: &ClassificationResult) -> String {
    let mut out = String::new();
    out.push_str(&result.summary);
    out.push_str("\n\n");

    out.push_str("Category: ");
    out.push_str(&hashtag(&result.category));
    out.push('\n');

    if !result.keywords.is_empty() {
        let tags: Vec<_> = result.keywords.iter().map(|k| hashtag(k)).collect();
        out.push_str("Tags: ");
        out.push_str(&tags.join(" "));
        out.push('\n');
    }

    if !result.links.is_empty() {
        out.push_str("\nLinks found:\n");
        for link in &result.links {
            out.push_str("• ");
            out.push_str(link);
            out.push('\n');
        }
    }

    out
}

/// Render a classification result as Telegram `MarkdownV2`.
#[must_use]
pub fn render_markdown_reply(result: &ClassificationResult) -> String {
    let mut out = format!(
        "*Category:* {}\n",
        escape_markdown(&hashtag(&result.category))
    );
    if !result.keywords.is_empty() {
        let tags: Vec<_> = result
            .keywords
            .iter()
            .map(|k| escape_markdown(&hashtag(k)))
            .collect();
        out.push_str(&format!("*Tags:* {}\n", tags.join(" ")));
    }
    out.push_str(&format!("\n*Summary:* {}", escape_markdown(&result.summary)));
    out
}

/// Render a titled list of labels as hashtags, one per line.
///
/// Returns `empty` when there are no labels.
#[must_use]
pub fn render_label_list(title: &str, labels: &[String], empty: &str) -> String {
    if labels.is_empty() {
        return empty.to_string();
    }
    let mut out = format!("{title}\n");
    for label in labels {
        out.push_str(&hashtag(label));
        out.push('\n');
    }
    out
}

/// Escape `MarkdownV2` special characters with a backslash.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassificationResult {
        ClassificationResult {
            category: "Work Items".into(),
            keywords: vec!["Q3".into(), "team meeting".into()],
            summary: "Budget review.".into(),
            links: vec!["https://example.com/a".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_reply() {
        assert_eq!(
            render_reply(&sample()),
            "Budget review.\n\nCategory: #work_items\nTags: #q3 #team_meeting\n\nLinks found:\n• https://example.com/a\n"
        );
    }

    #[test]
    fn test_render_reply_without_tags_or_links() {
        let result = ClassificationResult {
            category: "general".into(),
            summary: "Hi".into(),
            ..Default::default()
        };
        assert_eq!(render_reply(&result), "Hi\n\nCategory: #general\n");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("#a_b.c!"), r"\#a\_b\.c\!");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_render_markdown_reply() {
        assert_eq!(
            render_markdown_reply(&sample()),
            "*Category:* \\#work\\_items\n*Tags:* \\#q3 \\#team\\_meeting\n\n*Summary:* Budget review\\."
        );
    }

    #[test]
    fn test_render_label_list() {
        assert_eq!(render_label_list("Your tags:", &[], "none"), "none");
        assert_eq!(
            render_label_list("Your tags:", &["a b".into()], "none"),
            "Your tags:\n#a_b\n"
        );
    }
}
