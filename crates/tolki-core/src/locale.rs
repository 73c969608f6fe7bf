//! Locale cascade resolution.
//!
//! The conversation log records language switches as `Markdown` items
//! carrying a `locale` field. The resolver reconciles the active display
//! language against the most recent of those checkpoints after any bulk
//! replacement of the log; earlier checkpoints are historical record, not
//! live state, and item content is never retranslated retroactively.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::history::HistoryManager;
use crate::item::{Item, ItemBuilder};

/// Locale used when a requested language table fails to load.
pub const FALLBACK_LOCALE: &str = "en";

/// Loader for language tables.
///
/// Loading is asynchronous (the original tables arrive as lazily-loaded
/// modules); the resolver awaits the load before continuing.
#[async_trait]
pub trait LocaleLoader: Send + Sync {
    /// Loads the language table for `locale`.
    async fn load(&self, locale: &str) -> Result<()>;
}

/// Reconciles the active display language against the log's locale
/// checkpoints.
pub struct LocaleCascadeResolver {
    loader: Arc<dyn LocaleLoader>,
    active: String,
}

impl LocaleCascadeResolver {
    pub fn new(loader: Arc<dyn LocaleLoader>, initial_locale: impl Into<String>) -> Self {
        Self {
            loader,
            active: initial_locale.into(),
        }
    }

    /// The currently active display locale.
    pub fn active_locale(&self) -> &str {
        &self.active
    }

    /// The last requested locale: the first non-empty checkpoint found
    /// scanning tail to head.
    pub fn last_requested_locale(items: &[Item]) -> Option<&str> {
        items.iter().rev().find_map(Item::locale_checkpoint)
    }

    /// Switches the active language, awaiting the table load. Falls back to
    /// [`FALLBACK_LOCALE`] if the requested table cannot be loaded.
    pub async fn set_language(&mut self, locale: &str) {
        match self.loader.load(locale).await {
            Ok(()) => {
                self.active = locale.to_string();
            }
            Err(err) => {
                warn!(locale, %err, "failed to load locale, falling back");
                if let Err(err) = self.loader.load(FALLBACK_LOCALE).await {
                    warn!(%err, "failed to load fallback locale");
                }
                self.active = FALLBACK_LOCALE.to_string();
            }
        }
    }

    /// Reconciliation pass run after any bulk replacement of the log.
    ///
    /// If the last requested locale differs from the active one, switches
    /// language and persists again so the stored log reflects the
    /// post-switch world.
    pub async fn cascade(&mut self, history: &mut HistoryManager) -> Result<()> {
        let last = Self::last_requested_locale(history.items()).map(str::to_string);
        let Some(locale) = last else {
            return Ok(());
        };

        if locale != self.active {
            debug!(from = %self.active, to = %locale, "cascading locale change");
            self.set_language(&locale).await;
            history.persist()?;
        }
        Ok(())
    }

    /// The `set_locale` command path: switch language and leave a checkpoint
    /// in the log. Bypasses the standard history flow because the change
    /// itself is not a conversational event beyond the marker it leaves.
    pub async fn change_language(
        &mut self,
        locale: &str,
        history: &mut HistoryManager,
    ) -> Result<()> {
        self.set_language(locale).await;
        history.add_item(ItemBuilder::locale_checkpoint(&self.active));
        history.clear_temporary_items();
        history.persist()
    }
}
