//! Command registry with middleware support.

use std::collections::HashMap;

use tracing::{debug, error, warn};

use super::{Command, CommandContext, CommandEffects, CommandInput, CommandMiddleware};
use crate::error::{Result, TolkiError};

/// Registry mapping command names to handlers.
///
/// Constructed once and passed by reference to whoever dispatches commands;
/// never ambient global state.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
    middlewares: Vec<Box<dyn CommandMiddleware>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, overwriting any previous registration with the
    /// same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name();
        if self.commands.insert(name, command).is_some() {
            warn!(command = name, "command already registered, overwriting");
        }
    }

    /// Registers multiple commands.
    pub fn register_many(&mut self, commands: Vec<Box<dyn Command>>) {
        for command in commands {
            self.register(command);
        }
    }

    /// Adds a middleware; middlewares run in registration order.
    pub fn add_middleware(&mut self, middleware: Box<dyn CommandMiddleware>) {
        self.middlewares.push(middleware);
    }

    /// Executes a command by name.
    ///
    /// Dispatch order: lookup, `validate`, `can_execute`, then the body
    /// wrapped in before/after middleware. An inapplicable command is a
    /// silent no-op; unknown names and invalid parameters are errors.
    pub async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        name: &str,
        input: CommandInput,
    ) -> Result<CommandEffects> {
        let Some(command) = self.commands.get(name) else {
            let err = TolkiError::unknown_command(name);
            self.notify_error(name, &err);
            return Err(err);
        };

        if !command.validate(&input) {
            let err = TolkiError::invalid_params(name);
            self.notify_error(name, &err);
            return Err(err);
        }

        if !command.can_execute(ctx, &input) {
            debug!(command = name, "command not applicable, skipping");
            return Ok(CommandEffects::default());
        }

        for middleware in &self.middlewares {
            middleware.before(name, &input);
        }

        match command.execute(ctx, input).await {
            Ok(effects) => {
                for middleware in &self.middlewares {
                    middleware.after(name);
                }
                Ok(effects)
            }
            Err(err) => {
                self.notify_error(name, &err);
                Err(err)
            }
        }
    }

    fn notify_error(&self, name: &str, err: &TolkiError) {
        for middleware in &self.middlewares {
            middleware.on_error(name, err);
        }
    }

    /// Whether a command with this name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Removes a command; returns whether it existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    /// Names of all registered commands.
    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Removes every registered command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

/// Middleware that traces command execution.
pub struct LoggingMiddleware;

impl CommandMiddleware for LoggingMiddleware {
    fn before(&self, command: &str, input: &CommandInput) {
        debug!(command, argument = ?input.argument, "executing command");
    }

    fn on_error(&self, command: &str, err: &TolkiError) {
        error!(command, %err, "command failed");
    }
}
