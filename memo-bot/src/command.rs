//! Chat commands.
//!
//! A line starting with `/` is a command; anything else is a note to
//! classify.

use memo::UserId;

use crate::format::{hashtag, render_label_list};
use crate::tags::TagBook;

/// Help text listing every command.
pub const CHAT_HELP: &str = "\
Send any text to have it classified.

Commands:
  /tags                     list your tags
  /categories               list your categories
  /addcategory <name>       add a category
  /removecategory <name>    remove a category
  /maxtags <number>         set the maximum number of tags per note
  /help                     show this help
  /quit                     exit";

/// One parsed chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Show the help text.
    Help,
    /// Leave the chat.
    Quit,
    /// List the user's tags.
    Tags,
    /// List the user's categories.
    Categories,
    /// Add a category.
    AddCategory(String),
    /// Remove a category.
    RemoveCategory(String),
    /// Set the user's tag budget.
    MaxTags(usize),
    /// A command was given bad or missing arguments.
    Usage(&'static str),
    /// Not a known command.
    Unknown(String),
    /// Free text to classify.
    Note(String),
}

impl ChatCommand {
    /// Parse a chat line. Blank lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Note(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        // Telegram-style `/cmd@botname`.
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        let arg = parts.next();

        let parsed = match name.as_str() {
            "help" | "start" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "tags" => Self::Tags,
            "categories" => Self::Categories,
            "addcategory" => arg.map_or(
                Self::Usage(
                    "Please provide a category name.\nUsage: /addcategory <category_name>",
                ),
                |c| Self::AddCategory(c.to_lowercase()),
            ),
            "removecategory" => arg.map_or(
                Self::Usage(
                    "Please provide a category name.\nUsage: /removecategory <category_name>",
                ),
                |c| Self::RemoveCategory(c.to_lowercase()),
            ),
            "maxtags" => match arg.map(str::parse::<usize>) {
                None => Self::Usage(
                    "Please provide the maximum number of tags.\nUsage: /maxtags <number>",
                ),
                Some(Ok(n)) if n >= 1 => Self::MaxTags(n),
                Some(_) => Self::Usage("Please provide a valid positive number."),
            },
            _ => Self::Unknown(name),
        };
        Some(parsed)
    }

    /// Run a command against the user's tag book and return the reply.
    ///
    /// Returns `None` for [`Quit`](Self::Quit) and [`Note`](Self::Note),
    /// which the caller handles.
    pub async fn respond(&self, user_id: UserId, book: &TagBook) -> Option<String> {
        let reply = match self {
            Self::Quit | Self::Note(_) => return None,
            Self::Help => CHAT_HELP.to_string(),
            Self::Tags => render_label_list(
                "Your tags:",
                &book.tags(user_id).await,
                "You don't have any tags yet.",
            ),
            Self::Categories => render_label_list(
                "Your categories:",
                &book.categories(user_id).await,
                "You don't have any categories yet.",
            ),
            Self::AddCategory(category) => {
                book.add_category(user_id, category).await;
                format!("Added category: {}", hashtag(category))
            }
            Self::RemoveCategory(category) => {
                if book.remove_category(user_id, category).await {
                    format!("Removed category: {}", hashtag(category))
                } else {
                    format!("You don't have the category {}.", hashtag(category))
                }
            }
            Self::MaxTags(max_tags) => {
                book.set_max_tags(user_id, *max_tags).await;
                format!("Updated maximum tags to: {max_tags}")
            }
            Self::Usage(usage) => (*usage).to_string(),
            Self::Unknown(_) => "Unknown command. Use /help to see available commands.".into(),
        };
        Some(reply)
    }
}
