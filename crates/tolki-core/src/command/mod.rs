//! Command dispatch.
//!
//! User/UI interactions reach the engine as named commands dispatched
//! through an explicit [`CommandRegistry`] instance. A command separates
//! `validate` (malformed input, an error) from `can_execute` (well-formed
//! but currently pointless, a silent skip) so ordinary UI races like a
//! double-click never surface as user-facing errors.
//!
//! # Module Structure
//!
//! - `registry`: name-to-command map with middleware support
//! - `builtin`: the commands shipped with the engine
//! - `suggestion`: `[command arg]` markers embedded in suggestion strings

mod builtin;
mod registry;
mod suggestion;

pub use builtin::{
    CancelActionCommand, ResetChatCommand, SetLocaleCommand, ShowCartCommand, ShowOrdersCommand,
    builtin_commands,
};
pub use registry::{CommandRegistry, LoggingMiddleware};
pub use suggestion::{ExtractedSuggestion, command_display_name, extract_command};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, TolkiError};
use crate::history::HistoryManager;
use crate::item::Item;
use crate::locale::LocaleCascadeResolver;
use crate::scroll::ScrollAnchor;
use crate::session::{BotProps, SessionState, SettingsRepository};
use crate::storefront::SharedStorefront;

/// Parameters passed to a command invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
    /// Positional string argument (e.g. the locale code of `set_locale`).
    pub argument: Option<String>,
    /// Structured payload forwarded from an action button.
    pub data: Option<Value>,
    /// The log item the command targets (e.g. the action to cancel).
    pub target: Option<Item>,
}

impl CommandInput {
    /// An invocation with no parameters.
    pub fn none() -> Self {
        Self::default()
    }

    /// An invocation carrying one string argument.
    pub fn with_argument(argument: impl Into<String>) -> Self {
        Self {
            argument: Some(argument.into()),
            ..Self::default()
        }
    }

    /// An invocation targeting a specific log item.
    pub fn with_target(target: Item) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }
}

/// Mutable view of the session handed to an executing command.
///
/// Built per dispatch from disjoint borrows of the controller's fields;
/// commands never reach shared global state.
pub struct CommandContext<'a> {
    pub history: &'a mut HistoryManager,
    pub locale: &'a mut LocaleCascadeResolver,
    pub storefront: &'a SharedStorefront,
    pub state: &'a mut SessionState,
    pub settings: &'a dyn SettingsRepository,
    pub props: Option<&'a BotProps>,
}

/// Side effects a command requests from the caller after it completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEffects {
    /// Viewport reconciliation anchor, if the command changed the log.
    pub scroll: Option<ScrollAnchor>,
}

impl CommandEffects {
    pub fn scroll_to(anchor: ScrollAnchor) -> Self {
        Self {
            scroll: Some(anchor),
        }
    }
}

/// A named, guarded operation against the session.
#[async_trait]
pub trait Command: Send + Sync {
    /// Registry name of this command.
    fn name(&self) -> &'static str;

    /// Rejects malformed parameters. A `false` here is a caller error.
    fn validate(&self, _input: &CommandInput) -> bool {
        true
    }

    /// Whether the command is currently applicable. A `false` here is not
    /// an error; dispatch silently skips the command.
    fn can_execute(&self, _ctx: &CommandContext<'_>, _input: &CommandInput) -> bool {
        true
    }

    /// Runs the command body.
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        input: CommandInput,
    ) -> Result<CommandEffects>;
}

/// Cross-cutting hooks around command execution.
pub trait CommandMiddleware: Send + Sync {
    fn before(&self, _command: &str, _input: &CommandInput) {}
    fn after(&self, _command: &str) {}
    fn on_error(&self, _command: &str, _error: &TolkiError) {}
}
