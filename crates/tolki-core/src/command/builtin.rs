//! Builtin commands provided by the engine.
//!
//! These cover the UI surfaces that dispatch by name: action buttons
//! (`showCart`, `showCartAndRemoveNotification`, `resetChat`,
//! `cancelAction`) and suggestion markers (`show_cart`, `show_orders`,
//! `set_locale`).

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{Command, CommandContext, CommandEffects, CommandInput};
use crate::error::{Result, TolkiError};
use crate::item::{Item, ItemBuilder};
use crate::scroll::ScrollAnchor;
use crate::session::{heading_messages, keys};

/// The full builtin command set, ready for registration.
pub fn builtin_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(ShowCartCommand::button()),
        Box::new(ShowCartCommand::suggestion()),
        Box::new(ShowCartCommand::with_notification_removal()),
        Box::new(ShowOrdersCommand),
        Box::new(ResetChatCommand),
        Box::new(CancelActionCommand),
        Box::new(SetLocaleCommand::default()),
    ]
}

/// Appends the live cart panel to the log.
///
/// The cart panel is singleton-style: any prior `Cart` item is removed
/// before the new one is appended. One variant also clears cart
/// notifications first.
pub struct ShowCartCommand {
    name: &'static str,
    remove_notification: bool,
}

impl ShowCartCommand {
    /// The action-button flavor.
    pub fn button() -> Self {
        Self {
            name: "showCart",
            remove_notification: false,
        }
    }

    /// The suggestion-marker flavor.
    pub fn suggestion() -> Self {
        Self {
            name: "show_cart",
            remove_notification: false,
        }
    }

    /// The flavor dispatched from the cart notification itself.
    pub fn with_notification_removal() -> Self {
        Self {
            name: "showCartAndRemoveNotification",
            remove_notification: true,
        }
    }
}

#[async_trait]
impl Command for ShowCartCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_execute(&self, ctx: &CommandContext<'_>, _input: &CommandInput) -> bool {
        ctx.storefront.has_cart() && ctx.storefront.has_cart_items()
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _input: CommandInput,
    ) -> Result<CommandEffects> {
        if self.remove_notification {
            ctx.history.remove_cart_notifications();
        }
        ctx.history
            .remove_items(|item| matches!(item, Item::Cart));
        ctx.history.add_item(ItemBuilder::cart());
        ctx.history.execute_standard_flow(None::<fn()>)?;
        Ok(CommandEffects::scroll_to(ScrollAnchor::LastMessage))
    }
}

/// Appends the live orders panel to the log (singleton-style).
pub struct ShowOrdersCommand;

#[async_trait]
impl Command for ShowOrdersCommand {
    fn name(&self) -> &'static str {
        "show_orders"
    }

    fn can_execute(&self, ctx: &CommandContext<'_>, _input: &CommandInput) -> bool {
        ctx.storefront.has_orders() && ctx.storefront.order_count() > 0
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _input: CommandInput,
    ) -> Result<CommandEffects> {
        ctx.history
            .remove_items(|item| matches!(item, Item::Orders));
        ctx.history.add_item(ItemBuilder::orders());
        ctx.history.execute_standard_flow(None::<fn()>)?;
        Ok(CommandEffects::scroll_to(ScrollAnchor::LastMessage))
    }
}

/// Starts a fresh conversation under a new session id.
pub struct ResetChatCommand;

#[async_trait]
impl Command for ResetChatCommand {
    fn name(&self) -> &'static str {
        "resetChat"
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _input: CommandInput,
    ) -> Result<CommandEffects> {
        let chat_id = Uuid::new_v4().to_string();
        ctx.state.chat_id = chat_id.clone();
        ctx.settings
            .set(&ctx.state.bot_id, keys::CHAT, Value::String(chat_id))?;

        let heading = heading_messages(ctx.props, ctx.storefront);
        ctx.history.replace_history(heading);
        ctx.locale.cascade(ctx.history).await?;
        ctx.history.persist()?;
        Ok(CommandEffects::scroll_to(ScrollAnchor::Tail))
    }
}

/// Removes one specific `Action` item from the log (e.g. dismissing the
/// reset confirmation).
pub struct CancelActionCommand;

#[async_trait]
impl Command for CancelActionCommand {
    fn name(&self) -> &'static str {
        "cancelAction"
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        input: CommandInput,
    ) -> Result<CommandEffects> {
        if let Some(target) = &input.target {
            ctx.history.remove_item(target);
        }
        Ok(CommandEffects::default())
    }
}

/// Changes the active display language.
///
/// Delegates to the locale cascade path instead of the standard history
/// flow: a language change is not a conversational event beyond the
/// checkpoint marker it leaves behind.
pub struct SetLocaleCommand {
    supported: Vec<String>,
}

impl Default for SetLocaleCommand {
    fn default() -> Self {
        Self {
            supported: ["en", "it", "es", "fr", "de", "pt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SetLocaleCommand {
    pub fn with_supported_locales(supported: Vec<String>) -> Self {
        Self { supported }
    }

    pub fn add_supported_locale(&mut self, locale: impl Into<String>) {
        let locale = locale.into();
        if !self.supported.contains(&locale) {
            self.supported.push(locale);
        }
    }

    pub fn supported_locales(&self) -> &[String] {
        &self.supported
    }
}

#[async_trait]
impl Command for SetLocaleCommand {
    fn name(&self) -> &'static str {
        "set_locale"
    }

    fn validate(&self, input: &CommandInput) -> bool {
        input
            .argument
            .as_ref()
            .is_some_and(|locale| locale.len() >= 2)
    }

    fn can_execute(&self, _ctx: &CommandContext<'_>, input: &CommandInput) -> bool {
        input
            .argument
            .as_ref()
            .is_some_and(|locale| self.supported.contains(&locale.to_lowercase()))
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        input: CommandInput,
    ) -> Result<CommandEffects> {
        let locale = input
            .argument
            .ok_or_else(|| TolkiError::invalid_params(self.name()))?;
        ctx.locale.change_language(&locale, ctx.history).await?;
        Ok(CommandEffects::scroll_to(ScrollAnchor::LastMessage))
    }
}
