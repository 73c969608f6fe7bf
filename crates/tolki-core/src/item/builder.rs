//! Constructors for conversation items.

use serde_json::Value;

use super::{ActionButton, Item, MarkdownLevel};

/// Builds conversation items with the defaults the engine expects.
pub struct ItemBuilder;

impl ItemBuilder {
    /// The ephemeral "awaiting response" placeholder.
    pub fn thinking() -> Item {
        Item::Thinking
    }

    /// A user-authored message. Returns `None` for whitespace-only input.
    pub fn user_input(message: &str) -> Option<Item> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Item::UserInput {
            content: trimmed.to_string(),
        })
    }

    /// A markdown bubble. Returns `None` for empty content.
    pub fn markdown(message: &str, level: MarkdownLevel, translate: bool) -> Option<Item> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Item::Markdown {
            content: trimmed.to_string(),
            caption: None,
            level,
            locale: None,
            translate: translate.then_some(true),
            template_key: None,
            template_params: None,
        })
    }

    /// A regular assistant message.
    pub fn assistant(message: &str) -> Option<Item> {
        Self::markdown(message, MarkdownLevel::Default, false)
    }

    /// An info notice, optionally tagged with a template key so the render
    /// layer can substitute the translated string.
    pub fn info(message: &str, template_key: Option<&str>) -> Option<Item> {
        let mut item = Self::markdown(message, MarkdownLevel::Info, true)?;
        if let Item::Markdown {
            template_key: key, ..
        } = &mut item
        {
            *key = template_key.map(str::to_string);
        }
        Some(item)
    }

    /// The generic per-round-trip error bubble.
    pub fn error_bubble() -> Item {
        Self::markdown(
            "Sorry, there was an error processing your message.",
            MarkdownLevel::Error,
            true,
        )
        .expect("error message is non-empty")
    }

    /// An info notice carrying a locale checkpoint. Appended when the active
    /// display language changes.
    pub fn locale_checkpoint(locale: &str) -> Item {
        Item::Markdown {
            content: "Language changed.".to_string(),
            caption: None,
            level: MarkdownLevel::Info,
            locale: Some(locale.to_string()),
            translate: Some(true),
            template_key: Some("language_changed".to_string()),
            template_params: None,
        }
    }

    /// A message with attached action buttons.
    pub fn action(text: &str, actions: Vec<ActionButton>, data: Option<Value>) -> Item {
        Item::Action {
            text: text.to_string(),
            actions,
            data,
            translate: Some(true),
            template_key: None,
            template_params: None,
        }
    }

    /// The live cart panel.
    pub fn cart() -> Item {
        Item::Cart
    }

    /// The live orders panel.
    pub fn orders() -> Item {
        Item::Orders
    }

    /// The ephemeral cart notification.
    pub fn cart_notification() -> Item {
        Item::CartNotification
    }

    /// Human-readable name for a supported locale code.
    pub fn language_name(locale: &str) -> &str {
        match locale {
            "en" => "English",
            "it" => "Italiano",
            "es" => "Español",
            "fr" => "Français",
            "de" => "Deutsch",
            "pt" => "Português",
            other => other,
        }
    }
}
