//! The session controller.
//!
//! `ChatController` is the engine's public entry point: it owns the
//! conversation log, the command registry, the locale resolver and the
//! session state, and drives the message round trip. The render layer talks
//! to it through its methods and observes it through the state channel and
//! the history mutation subscriber.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    BotProps, BotStatus, MessageEndpoint, MessageOutcome, SessionState, SettingsRepository,
    heading_messages, keys,
};
use crate::command::{
    Command, CommandContext, CommandInput, CommandRegistry, LoggingMiddleware, builtin_commands,
    command_display_name, extract_command,
};
use crate::error::Result;
use crate::history::{HistoryManager, HistoryPersistence, MutationSubscriber};
use crate::item::{ActionButton, Item, ItemBuilder};
use crate::locale::{LocaleCascadeResolver, LocaleLoader};
use crate::scroll::{ScrollAnchor, ScrollReconciler, ScrollState, Viewport};
use crate::storefront::SharedStorefront;

/// Persistence sink that writes the log under the session's `history` key.
struct SettingsHistorySink {
    settings: Arc<dyn SettingsRepository>,
    bot_id: String,
}

impl HistoryPersistence for SettingsHistorySink {
    fn persist_history(&self, items: &[Item]) -> Result<()> {
        let snapshot = serde_json::to_value(items)?;
        self.settings.set(&self.bot_id, keys::HISTORY, snapshot)
    }
}

/// Owns one chat session end to end.
pub struct ChatController {
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    history: HistoryManager,
    registry: CommandRegistry,
    locale: LocaleCascadeResolver,
    storefront: SharedStorefront,
    endpoint: Arc<dyn MessageEndpoint>,
    settings: Arc<dyn SettingsRepository>,
    props: Option<BotProps>,
    scroll: Option<ScrollReconciler>,
}

impl ChatController {
    /// Creates a controller for `bot_id` with the builtin command set
    /// registered. Call [`init`](Self::init) before anything else.
    pub fn new(
        bot_id: impl Into<String>,
        initial_locale: impl Into<String>,
        endpoint: Arc<dyn MessageEndpoint>,
        settings: Arc<dyn SettingsRepository>,
        loader: Arc<dyn LocaleLoader>,
        storefront: SharedStorefront,
    ) -> Self {
        let bot_id = bot_id.into();
        let state = SessionState {
            bot_id: bot_id.clone(),
            ..SessionState::default()
        };
        let (state_tx, _) = watch::channel(state.clone());

        let sink = Arc::new(SettingsHistorySink {
            settings: settings.clone(),
            bot_id,
        });

        let mut registry = CommandRegistry::new();
        registry.register_many(builtin_commands());
        registry.add_middleware(Box::new(LoggingMiddleware));

        Self {
            state,
            state_tx,
            history: HistoryManager::new(sink),
            registry,
            locale: LocaleCascadeResolver::new(loader, initial_locale),
            storefront,
            endpoint,
            settings,
            props: None,
            scroll: None,
        }
    }

    /// Attaches the rendered viewport, enabling scroll reconciliation.
    pub fn with_viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.scroll = Some(ScrollReconciler::new(viewport));
        self
    }

    /// Registers a host-defined command alongside the builtins.
    pub fn register_command(&mut self, command: Box<dyn Command>) {
        self.registry.register(command);
    }

    /// Registers the history mutation subscriber for the render layer.
    pub fn set_history_subscriber(&mut self, subscriber: MutationSubscriber) {
        self.history.set_subscriber(subscriber);
    }

    /// A receiver observing every session state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// The current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Read-only snapshot of the conversation log.
    pub fn items(&self) -> &[Item] {
        self.history.items()
    }

    /// The bot's display properties, once resolved.
    pub fn props(&self) -> Option<&BotProps> {
        self.props.as_ref()
    }

    /// Handle to the shared storefront state.
    pub fn storefront(&self) -> &SharedStorefront {
        &self.storefront
    }

    /// The bot's suggestion labels, decorated with live counts where the
    /// embedded command has something countable behind it.
    pub fn suggestion_labels(&self) -> Vec<String> {
        self.props
            .iter()
            .flat_map(|props| props.suggestions.iter())
            .map(|raw| {
                let extracted = extract_command(raw);
                command_display_name(&extracted, &self.storefront)
                    .unwrap_or(extracted.display_text)
            })
            .collect()
    }

    /// Current scroll-position flags, or the default when no viewport is
    /// attached.
    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
            .as_ref()
            .map(|scroll| scroll.observe())
            .unwrap_or_default()
    }

    /// Resolves the bot and restores (or seeds) the session.
    ///
    /// Any status other than `Ok` leaves the session disabled: the status is
    /// published for the render layer and nothing else happens.
    pub async fn init(&mut self) -> Result<()> {
        let resolved = self
            .endpoint
            .fetch_bot(&self.state.bot_id, self.locale.active_locale())
            .await;
        self.state.bot_status = resolved.status;
        self.props = resolved.props;

        if self.state.bot_status != BotStatus::Ok {
            warn!(status = ?self.state.bot_status, "bot unavailable, session disabled");
            self.publish();
            return Ok(());
        }

        self.state.chat_id = self.load_or_create_chat_id()?;
        self.state.open = self.load_open_flag()?;
        self.restore_history().await?;
        self.publish();
        self.align(ScrollAnchor::Tail, false).await;
        Ok(())
    }

    fn load_or_create_chat_id(&self) -> Result<String> {
        let stored = self
            .settings
            .get(&self.state.bot_id, keys::CHAT)?
            .and_then(|value| value.as_str().map(str::to_string));
        if let Some(chat_id) = stored {
            if Uuid::parse_str(&chat_id).is_ok() {
                return Ok(chat_id);
            }
            warn!("stored chat id malformed, regenerating");
        }

        let chat_id = Uuid::new_v4().to_string();
        info!(chat_id = %chat_id, "starting new chat session");
        self.settings.set(
            &self.state.bot_id,
            keys::CHAT,
            Value::String(chat_id.clone()),
        )?;
        Ok(chat_id)
    }

    fn load_open_flag(&self) -> Result<bool> {
        let stored = self
            .settings
            .get(&self.state.bot_id, keys::OPEN)?
            .and_then(|value| value.as_bool());
        Ok(stored.unwrap_or_else(|| {
            self.props
                .as_ref()
                .map(|props| props.default_open)
                .unwrap_or(false)
        }))
    }

    async fn restore_history(&mut self) -> Result<()> {
        let stored = self.settings.get(&self.state.bot_id, keys::HISTORY)?;
        let items = match stored {
            Some(value) => match serde_json::from_value::<Vec<Item>>(value) {
                Ok(items) => items,
                Err(err) => {
                    warn!(%err, "stored history unreadable, starting fresh");
                    self.settings.remove(&self.state.bot_id, keys::HISTORY)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if items.is_empty() {
            let heading = heading_messages(self.props.as_ref(), &self.storefront);
            self.history.replace_history(heading);
            self.history.persist()?;
        } else {
            self.history.replace_history(items);
            // Persisted logs carry no ephemeral items; re-derive the cart
            // notification from the live storefront.
            if self.storefront.should_seed_cart_notification()
                && !self.history.items().iter().any(Item::is_cart_notification)
            {
                self.history.add_item(ItemBuilder::cart_notification());
            }
        }

        self.locale.cascade(&mut self.history).await
    }

    /// Runs one message round trip: append the user message and the
    /// `Thinking` placeholder, send, then settle the log from the outcome.
    ///
    /// Failures of the round trip itself never surface as errors; they
    /// become an error bubble in the log. Whitespace-only input and
    /// submissions while a round trip is in flight are ignored.
    pub async fn submit_message(&mut self, message: &str) -> Result<()> {
        if self.state.bot_status != BotStatus::Ok {
            debug!("session disabled, ignoring submission");
            return Ok(());
        }
        if self.state.pending {
            debug!("round trip in flight, ignoring submission");
            return Ok(());
        }
        let Some(user_item) = ItemBuilder::user_input(message) else {
            return Ok(());
        };
        let text = message.trim().to_string();

        self.state.pending = true;
        self.publish();
        self.history.add_item(user_item);
        self.history.clear_temporary_items();
        self.history.persist()?;
        self.history.add_item(ItemBuilder::thinking());
        self.align(ScrollAnchor::LastMessage, true).await;

        // Responses are only valid for the chat they were sent under; a
        // reset mid-flight orphans the response.
        let chat_id = self.state.chat_id.clone();
        let outcome = self
            .endpoint
            .send_message(&self.state.bot_id, &chat_id, &text)
            .await;

        if chat_id != self.state.chat_id {
            debug!("chat id changed mid-flight, dropping response");
            self.state.pending = false;
            self.publish();
            return Ok(());
        }

        let insert_at = self
            .history
            .thinking_index()
            .unwrap_or(self.history.items().len());
        self.history.remove_items(Item::is_thinking);

        match outcome {
            MessageOutcome::Success(items) => {
                let batch_len = items.len();
                self.history.insert_items(insert_at, items);
                self.locale.cascade(&mut self.history).await?;
                self.history.persist()?;
                if batch_len > 0 {
                    self.align(ScrollAnchor::Message(insert_at), true).await;
                }
            }
            MessageOutcome::Malformed => {
                warn!("response body was not an item array, settling without items");
                self.history.persist()?;
            }
            MessageOutcome::NotOk { status } => {
                warn!(status, "message rejected by backend");
                self.append_error_bubble().await?;
            }
            MessageOutcome::BadMessage => {
                warn!("message rejected before sending");
                self.append_error_bubble().await?;
            }
            MessageOutcome::Error(error) => {
                warn!(%error, "message round trip failed");
                self.append_error_bubble().await?;
            }
        }

        self.state.pending = false;
        self.publish();
        Ok(())
    }

    async fn append_error_bubble(&mut self) -> Result<()> {
        self.history.add_item(ItemBuilder::error_bubble());
        self.history.persist()?;
        self.align(ScrollAnchor::Tail, true).await;
        Ok(())
    }

    /// Dispatches a named command through the registry and applies its
    /// requested effects.
    pub async fn execute_command(&mut self, name: &str, input: CommandInput) -> Result<()> {
        let mut ctx = CommandContext {
            history: &mut self.history,
            locale: &mut self.locale,
            storefront: &self.storefront,
            state: &mut self.state,
            settings: self.settings.as_ref(),
            props: self.props.as_ref(),
        };
        let effects = self.registry.execute(&mut ctx, name, input).await?;

        self.publish();
        if let Some(anchor) = effects.scroll {
            self.align(anchor, true).await;
        }
        Ok(())
    }

    /// Runs a chosen suggestion: its embedded command if it carries one,
    /// otherwise the visible text as a regular message.
    pub async fn execute_suggestion(&mut self, suggestion: &str) -> Result<()> {
        let extracted = extract_command(suggestion);
        match extracted.command {
            Some(command) => {
                let input = CommandInput {
                    argument: extracted.argument,
                    ..CommandInput::default()
                };
                self.execute_command(&command, input).await
            }
            None => self.submit_message(&extracted.display_text).await,
        }
    }

    /// Appends the reset confirmation prompt. The actual reset only happens
    /// when the user confirms via the `resetChat` button; `cancelAction`
    /// removes the prompt again.
    pub async fn request_reset(&mut self) {
        // One confirmation prompt at a time.
        self.history.remove_items(is_reset_confirmation);
        self.history.add_item(reset_confirmation());
        self.align(ScrollAnchor::LastMessage, true).await;
    }

    /// Toggles the widget panel and persists the preference.
    pub fn toggle_open(&mut self) -> Result<()> {
        self.set_open(!self.state.open)
    }

    /// Opens or closes the widget panel and persists the preference.
    pub fn set_open(&mut self, open: bool) -> Result<()> {
        self.state.open = open;
        self.settings
            .set(&self.state.bot_id, keys::OPEN, Value::Bool(open))?;
        self.publish();
        Ok(())
    }

    async fn align(&self, anchor: ScrollAnchor, animated: bool) {
        if let Some(scroll) = &self.scroll {
            scroll.align(anchor, animated).await;
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

fn reset_confirmation() -> Item {
    ItemBuilder::action(
        "Start a new conversation? The current one will be cleared.",
        vec![
            ActionButton {
                label: "Reset".to_string(),
                primary: true,
                command: "resetChat".to_string(),
                data: None,
                template_key: Some("reset_confirm".to_string()),
            },
            ActionButton {
                label: "Cancel".to_string(),
                primary: false,
                command: "cancelAction".to_string(),
                data: None,
                template_key: Some("reset_cancel".to_string()),
            },
        ],
        None,
    )
}

fn is_reset_confirmation(item: &Item) -> bool {
    match item {
        Item::Action { actions, .. } => actions
            .iter()
            .any(|button| button.command == "resetChat"),
        _ => false,
    }
}
