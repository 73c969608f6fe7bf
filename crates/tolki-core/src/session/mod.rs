//! Session lifecycle and the round-trip controller.
//!
//! # Module Structure
//!
//! - `repository`: per-bot settings persistence (`SettingsRepository`)
//! - `endpoint`: backend abstraction (`MessageEndpoint`, `MessageOutcome`)
//! - `controller`: `ChatController`, the engine's public entry point

mod controller;
mod endpoint;
mod repository;

#[cfg(test)]
mod controller_test;

pub use controller::ChatController;
pub use endpoint::{MessageEndpoint, MessageOutcome};
pub use repository::{SettingsRepository, keys};

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemBuilder};
use crate::storefront::SharedStorefront;

/// Installation status of a bot, as resolved at init.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BotStatus {
    /// Installed and active; the session may proceed.
    Ok,
    /// The bot id resolves to nothing.
    NotFound,
    /// The bot exists but is disabled.
    Inactive,
    /// The bot id is not syntactically valid.
    Invalid,
    /// The bot exists but is not installed on this site.
    NotInstalled,
    /// Status could not be resolved (transport failure, unexpected answer).
    #[default]
    Unknown,
}

// Hand-written so unrecognized statuses decode as `Unknown` instead of
// failing the whole payload.
impl<'de> Deserialize<'de> for BotStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(match value.as_str() {
            "ok" => BotStatus::Ok,
            "notFound" => BotStatus::NotFound,
            "inactive" => BotStatus::Inactive,
            "invalid" => BotStatus::Invalid,
            "notInstalled" => BotStatus::NotInstalled,
            _ => BotStatus::Unknown,
        })
    }
}

/// Display properties of a bot, as served by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotProps {
    pub name: String,
    pub avatar: Option<String>,
    pub welcome_message: Option<String>,
    pub suggestions: Vec<String>,
    pub default_open: bool,
    pub unbranded: bool,
}

/// Result of resolving a bot at init.
#[derive(Debug, Clone, Default)]
pub struct BotInitResult {
    pub status: BotStatus,
    pub props: Option<BotProps>,
}

/// Mutable per-session state published to the render layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Bot the session belongs to.
    pub bot_id: String,
    /// Installation status resolved at init.
    pub bot_status: BotStatus,
    /// Active chat session id.
    pub chat_id: String,
    /// A message round trip is in flight.
    pub pending: bool,
    /// The widget panel is open.
    pub open: bool,
}

/// Builds the messages that head a fresh conversation: the privacy notice,
/// the bot's welcome message if configured, and a cart notification when
/// the live cart warrants one.
pub fn heading_messages(props: Option<&BotProps>, storefront: &SharedStorefront) -> Vec<Item> {
    let mut items = Vec::new();
    items.extend(ItemBuilder::info(
        "By chatting you agree to the privacy policy.",
        Some("privacy_policy"),
    ));
    if let Some(welcome) = props.and_then(|props| props.welcome_message.as_deref()) {
        items.extend(ItemBuilder::assistant(welcome));
    }
    if storefront.should_seed_cart_notification() {
        items.push(ItemBuilder::cart_notification());
    }
    items
}
