//! Command markers embedded in suggestion strings.
//!
//! A bot's configured suggestions can carry a trailing `[command]` or
//! `[command argument]` marker, e.g. `"Show my cart [show_cart]"` or
//! `"Parla italiano [set_locale it]"`. The marker is stripped from the
//! visible text and dispatched through the registry when the suggestion
//! is chosen.

use crate::item::ItemBuilder;
use crate::storefront::SharedStorefront;

/// A suggestion string split into its visible text and embedded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSuggestion {
    /// Command name from the marker, if one was present.
    pub command: Option<String>,
    /// Command argument from the marker, if present.
    pub argument: Option<String>,
    /// The suggestion text with the marker removed.
    pub display_text: String,
}

/// Splits a suggestion string into visible text and its embedded command.
///
/// Only a well-formed trailing marker counts; brackets appearing mid-text
/// stay part of the display text. An empty marker (`[]`) is ignored.
pub fn extract_command(text: &str) -> ExtractedSuggestion {
    let trimmed = text.trim_end();
    let plain = || ExtractedSuggestion {
        command: None,
        argument: None,
        display_text: text.trim().to_string(),
    };

    if !trimmed.ends_with(']') {
        return plain();
    }
    let Some(open) = trimmed.rfind('[') else {
        return plain();
    };

    let marker = trimmed[open + 1..trimmed.len() - 1].trim();
    if marker.contains('[') || marker.contains(']') {
        return plain();
    }
    let mut parts = marker.split_whitespace();
    let Some(command) = parts.next() else {
        return plain();
    };
    let argument = parts.next().map(str::to_string);

    ExtractedSuggestion {
        command: Some(command.to_string()),
        argument,
        display_text: trimmed[..open].trim().to_string(),
    }
}

/// Decorates a suggestion's display text with live counts where the command
/// has something countable behind it. Returns `None` when the base text
/// should be shown as-is.
pub fn command_display_name(
    suggestion: &ExtractedSuggestion,
    storefront: &SharedStorefront,
) -> Option<String> {
    let command = suggestion.command.as_deref()?;
    match command {
        "show_cart" | "showCart" => {
            let count = storefront.cart_item_count();
            (count > 0).then(|| format!("{} ({})", suggestion.display_text, count))
        }
        "show_orders" => {
            let count = storefront.order_count();
            (count > 0).then(|| format!("{} ({})", suggestion.display_text, count))
        }
        "set_locale" => suggestion.argument.as_deref().map(|locale| {
            format!(
                "{} ({})",
                suggestion.display_text,
                ItemBuilder::language_name(locale)
            )
        }),
        _ => None,
    }
}
