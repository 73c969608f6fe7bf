//! Built-in language tables.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use tolki_core::error::{Result, TolkiError};
use tolki_core::locale::{FALLBACK_LOCALE, LocaleLoader};

/// [`LocaleLoader`] over a fixed set of built-in language tables.
///
/// Tables are compiled in, so "loading" reduces to an availability check;
/// the translated strings are exposed through [`lookup`](Self::lookup) for
/// the render layer's template substitution.
pub struct StaticLocaleTables {
    tables: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for StaticLocaleTables {
    fn default() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            "en",
            HashMap::from([
                ("privacy_policy", "By chatting you agree to the privacy policy."),
                ("language_changed", "Language changed."),
                ("reset_confirm", "Reset"),
                ("reset_cancel", "Cancel"),
            ]),
        );
        tables.insert(
            "it",
            HashMap::from([
                ("privacy_policy", "Chattando accetti l'informativa sulla privacy."),
                ("language_changed", "Lingua cambiata."),
                ("reset_confirm", "Ricomincia"),
                ("reset_cancel", "Annulla"),
            ]),
        );
        tables.insert(
            "es",
            HashMap::from([
                ("privacy_policy", "Al chatear aceptas la política de privacidad."),
                ("language_changed", "Idioma cambiado."),
                ("reset_confirm", "Reiniciar"),
                ("reset_cancel", "Cancelar"),
            ]),
        );
        tables.insert(
            "fr",
            HashMap::from([
                ("privacy_policy", "En discutant, vous acceptez la politique de confidentialité."),
                ("language_changed", "Langue modifiée."),
                ("reset_confirm", "Réinitialiser"),
                ("reset_cancel", "Annuler"),
            ]),
        );
        tables.insert(
            "de",
            HashMap::from([
                ("privacy_policy", "Mit dem Chatten stimmst du der Datenschutzerklärung zu."),
                ("language_changed", "Sprache geändert."),
                ("reset_confirm", "Zurücksetzen"),
                ("reset_cancel", "Abbrechen"),
            ]),
        );
        tables.insert(
            "pt",
            HashMap::from([
                ("privacy_policy", "Ao conversar você concorda com a política de privacidade."),
                ("language_changed", "Idioma alterado."),
                ("reset_confirm", "Recomeçar"),
                ("reset_cancel", "Cancelar"),
            ]),
        );
        Self { tables }
    }
}

impl StaticLocaleTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locale codes with a built-in table.
    pub fn supported_locales(&self) -> Vec<&'static str> {
        self.tables.keys().copied().collect()
    }

    /// Translated string for `key` in `locale`, falling back to the
    /// [`FALLBACK_LOCALE`] table.
    pub fn lookup(&self, locale: &str, key: &str) -> Option<&'static str> {
        self.tables
            .get(locale)
            .and_then(|table| table.get(key))
            .or_else(|| {
                self.tables
                    .get(FALLBACK_LOCALE)
                    .and_then(|table| table.get(key))
            })
            .copied()
    }
}

#[async_trait]
impl LocaleLoader for StaticLocaleTables {
    async fn load(&self, locale: &str) -> Result<()> {
        if self.tables.contains_key(locale) {
            debug!(locale, "locale table ready");
            Ok(())
        } else {
            Err(TolkiError::UnsupportedLocale(locale.to_string()))
        }
    }
}
