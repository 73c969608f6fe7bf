//! Per-bot settings persistence.

use serde_json::Value;

use crate::error::Result;

/// Well-known settings keys.
///
/// All session state that survives a page reload lives under these keys,
/// namespaced by bot id.
pub mod keys {
    /// Persisted conversation log (JSON array of items).
    pub const HISTORY: &str = "history";
    /// Active chat session id.
    pub const CHAT: &str = "chat";
    /// Whether the widget panel is open.
    pub const OPEN: &str = "open";
}

/// Key/value settings store scoped by bot id.
///
/// Reads and writes are synchronous; implementations that sit on slow
/// storage are expected to cache. A missing key reads as `None`, never an
/// error.
pub trait SettingsRepository: Send + Sync {
    /// Reads the value stored under `key` for `bot_id`.
    fn get(&self, bot_id: &str, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key` for `bot_id`, overwriting any previous
    /// value.
    fn set(&self, bot_id: &str, key: &str, value: Value) -> Result<()>;

    /// Removes the value stored under `key` for `bot_id`.
    fn remove(&self, bot_id: &str, key: &str) -> Result<()>;
}
