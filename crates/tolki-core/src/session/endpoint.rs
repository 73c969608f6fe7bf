//! Backend message endpoint abstraction.

use async_trait::async_trait;

use super::BotInitResult;
use crate::item::Item;

/// Outcome of one message round trip.
///
/// Deliberately not a `Result`: every failure mode has a defined
/// conversational consequence (an error bubble), so transport and protocol
/// failures are data here, not errors to propagate.
#[derive(Debug, Clone)]
pub enum MessageOutcome {
    /// The backend answered with a batch of items, possibly empty.
    Success(Vec<Item>),
    /// The backend answered with a non-success HTTP status.
    NotOk { status: u16 },
    /// The request never completed (transport failure, timeout).
    Error(String),
    /// The message was rejected before sending (e.g. malformed chat id).
    BadMessage,
    /// The backend answered 2xx but the body was not an item array.
    Malformed,
}

/// The backend the session talks to.
#[async_trait]
pub trait MessageEndpoint: Send + Sync {
    /// Resolves the bot's installation status and display properties.
    async fn fetch_bot(&self, bot_id: &str, language: &str) -> BotInitResult;

    /// Sends one user message within a chat session.
    async fn send_message(&self, bot_id: &str, chat_id: &str, message: &str) -> MessageOutcome;
}
