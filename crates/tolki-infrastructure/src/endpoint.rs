//! HTTP implementation of the message endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use uuid::Uuid;

use tolki_core::item::Item;
use tolki_core::session::{BotInitResult, BotProps, BotStatus, MessageEndpoint, MessageOutcome};

/// Base URL of the embed chat API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.tolki.ai/chat/v1/embed";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`MessageEndpoint`] over the embed chat REST API.
///
/// - `GET  {base}/{bot_id}?lang={language}` resolves the bot
/// - `POST {base}/{bot_id}/chat/{chat_id}/message` sends a message
#[derive(Clone)]
pub struct HttpMessageEndpoint {
    client: Client,
    base_url: String,
}

impl Default for HttpMessageEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl HttpMessageEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MessageEndpoint for HttpMessageEndpoint {
    async fn fetch_bot(&self, bot_id: &str, language: &str) -> BotInitResult {
        if Uuid::parse_str(bot_id).is_err() {
            return BotInitResult {
                status: BotStatus::Invalid,
                props: None,
            };
        }

        let url = format!("{}/{}", self.base_url, bot_id);
        let response = match self
            .client
            .get(&url)
            .query(&[("lang", language)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "bot resolution request failed");
                return BotInitResult::default();
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => BotInitResult {
                status: BotStatus::NotFound,
                props: None,
            },
            StatusCode::FORBIDDEN => BotInitResult {
                status: BotStatus::Inactive,
                props: None,
            },
            status if status.is_success() => match response.json::<BotProps>().await {
                Ok(props) => BotInitResult {
                    status: BotStatus::Ok,
                    props: Some(props),
                },
                Err(err) => {
                    warn!(%err, "bot payload unreadable");
                    BotInitResult::default()
                }
            },
            status if status.is_client_error() => BotInitResult {
                status: BotStatus::NotInstalled,
                props: None,
            },
            status => {
                warn!(%status, "unexpected bot resolution status");
                BotInitResult::default()
            }
        }
    }

    async fn send_message(&self, bot_id: &str, chat_id: &str, message: &str) -> MessageOutcome {
        if Uuid::parse_str(chat_id).is_err() {
            warn!("refusing to send under a malformed chat id");
            return MessageOutcome::BadMessage;
        }

        let url = format!("{}/{}/chat/{}/message", self.base_url, bot_id, chat_id);
        debug!(%url, "sending message");

        let response = match self
            .client
            .post(&url)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return MessageOutcome::Error(err.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return MessageOutcome::NotOk {
                status: status.as_u16(),
            };
        }

        match response.json::<Vec<Item>>().await {
            Ok(items) => MessageOutcome::Success(items),
            Err(err) => {
                warn!(%err, "response body was not an item array");
                MessageOutcome::Malformed
            }
        }
    }
}
