//! JSON-backed settings store.
//!
//! All bots' settings live in a single JSON file, keyed by bot id and then
//! by setting key. The full document is cached in memory; every write
//! rewrites the file atomically via tmp file + rename.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

use tolki_core::error::{Result, TolkiError};
use tolki_core::session::SettingsRepository;

type SettingsDocument = HashMap<String, HashMap<String, Value>>;

/// File-backed [`SettingsRepository`].
pub struct JsonSettingsStore {
    path: PathBuf,
    cache: Mutex<SettingsDocument>,
}

impl JsonSettingsStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// An unreadable or malformed file is treated as empty; the next write
    /// replaces it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = Self::load(&path);
        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    /// Opens the store at the platform default location
    /// (`<config dir>/tolki/settings.json`).
    pub fn new_default() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| TolkiError::data_access("cannot find config directory"))?;
        Ok(Self::new(base.join("tolki").join("settings.json")))
    }

    fn load(path: &Path) -> SettingsDocument {
        if !path.exists() {
            return SettingsDocument::default();
        }
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => SettingsDocument::default(),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(document) => document,
                Err(err) => {
                    warn!(path = %path.display(), %err, "settings file malformed, starting empty");
                    SettingsDocument::default()
                }
            },
            Err(err) => {
                warn!(path = %path.display(), %err, "settings file unreadable, starting empty");
                SettingsDocument::default()
            }
        }
    }

    /// Writes the document atomically: tmp file in the same directory,
    /// fsync, then rename over the target.
    fn save(&self, document: &SettingsDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SettingsDocument>> {
        self.cache
            .lock()
            .map_err(|_| TolkiError::data_access("settings cache poisoned"))
    }
}

impl SettingsRepository for JsonSettingsStore {
    fn get(&self, bot_id: &str, key: &str) -> Result<Option<Value>> {
        let cache = self.lock()?;
        Ok(cache
            .get(bot_id)
            .and_then(|settings| settings.get(key))
            .cloned())
    }

    fn set(&self, bot_id: &str, key: &str, value: Value) -> Result<()> {
        let mut cache = self.lock()?;
        cache
            .entry(bot_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.save(&cache)
    }

    fn remove(&self, bot_id: &str, key: &str) -> Result<()> {
        let mut cache = self.lock()?;
        let emptied = match cache.get_mut(bot_id) {
            Some(settings) => {
                settings.remove(key);
                settings.is_empty()
            }
            None => return Ok(()),
        };
        if emptied {
            cache.remove(bot_id);
        }
        self.save(&cache)
    }
}
