//! Conversation item types.
//!
//! This module contains the tagged union of conversation log entries and
//! the builder used to construct them. The serialized tag names follow the
//! persisted schema and must stay stable across releases.

mod builder;

pub use builder::ItemBuilder;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity level of a markdown bubble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownLevel {
    /// Regular assistant message.
    #[default]
    Default,
    /// System notice (privacy policy, language changed, etc.).
    Info,
    /// User-visible error bubble.
    Error,
}

/// A single action button attached to an `Action` item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionButton {
    /// Button label shown to the user.
    pub label: String,
    /// Whether this is the primary (highlighted) choice.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
    /// Name of the command dispatched when the button is pressed.
    pub command: String,
    /// Optional payload forwarded to the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Template key for translatable labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
}

/// One tagged entry in the conversation log.
///
/// The union is closed: every entry the engine ever stores or receives from
/// the message endpoint is one of these kinds. `Thinking` and
/// `CartNotification` are ephemeral and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Item {
    /// A message with attached action buttons.
    #[serde(rename = "action", rename_all = "camelCase")]
    Action {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        actions: Vec<ActionButton>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translate: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_params: Option<Value>,
    },

    /// A display card; rendered by the external template layer.
    #[serde(rename = "card", rename_all = "camelCase")]
    Card {
        image: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    /// A markdown bubble. A non-empty `locale` marks a language-switch
    /// checkpoint.
    #[serde(rename = "markdown", rename_all = "camelCase")]
    Markdown {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default)]
        level: MarkdownLevel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translate: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_params: Option<Value>,
    },

    /// A product card; rendered by the external template layer.
    #[serde(rename = "product", rename_all = "camelCase")]
    Product {
        image: String,
        name: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    /// The live cart panel.
    #[serde(rename = "show_cart")]
    Cart,

    /// The live orders panel.
    #[serde(rename = "show_orders")]
    Orders,

    /// Ephemeral "awaiting response" placeholder. At most one exists in the
    /// log at any time.
    #[serde(rename = "thinking")]
    Thinking,

    /// A user-authored message; never empty after trimming.
    #[serde(rename = "userInput", rename_all = "camelCase")]
    UserInput { content: String },

    /// Ephemeral notice derived from the live cart state; never persisted.
    #[serde(rename = "cart_notification")]
    CartNotification,
}

impl Item {
    /// Whether this item is excluded from persistence and regenerated per
    /// session.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Item::Thinking | Item::CartNotification)
    }

    /// Whether this item belongs in the persisted subset.
    pub fn is_persistable(&self) -> bool {
        !self.is_ephemeral()
    }

    /// Whether this item is the "awaiting response" placeholder.
    pub fn is_thinking(&self) -> bool {
        matches!(self, Item::Thinking)
    }

    /// Recognizes a cart notification in either encoding.
    ///
    /// The log evolved through a schema migration: older logs encode the
    /// notification as an `Action` flagged with `isCartNotification` in its
    /// data payload, newer ones use the first-class `CartNotification` kind.
    pub fn is_cart_notification(&self) -> bool {
        match self {
            Item::CartNotification => true,
            Item::Action {
                data: Some(data), ..
            } => data
                .get("isCartNotification")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Returns the locale checkpoint carried by this item, if any.
    ///
    /// Empty locale strings are treated as no checkpoint.
    pub fn locale_checkpoint(&self) -> Option<&str> {
        match self {
            Item::Markdown {
                locale: Some(locale),
                ..
            } if !locale.is_empty() => Some(locale),
            _ => None,
        }
    }
}
