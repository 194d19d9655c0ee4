//! Language type: validated language codes and text direction.
//!
//! A `Language` can only be constructed from a code the registry knows and has
//! enabled, so everything downstream (cache keys, bundle paths, URLs) can
//! trust it without re-validating.

use crate::error::LocaleError;
use crate::i18n::{LanguageConfig, LanguageRegistry};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Text direction of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    /// Value for the HTML `dir` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Direction::Rtl)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, enabled language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language {
    /// ISO 639-1 language code (e.g., "en", "ar")
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };
    pub const FRENCH: Language = Language { code: "fr" };
    pub const SPANISH: Language = Language { code: "es" };
    pub const ARABIC: Language = Language { code: "ar" };

    /// Create a Language from an exact language code.
    ///
    /// No normalisation is applied: `"EN"` and `"en-US"` are rejected. Use
    /// [`Language::from_tag`] for header or browser input.
    pub fn from_code(code: &str) -> Result<Language, LocaleError> {
        match LanguageRegistry::get().get_by_code(code) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            _ => Err(LocaleError::Unsupported {
                code: code.to_string(),
            }),
        }
    }

    /// Create a Language from a locale tag such as `fr-CA` or `pt_BR`.
    ///
    /// Only the primary subtag is considered, case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Language> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        if primary.is_empty() {
            return None;
        }
        Language::from_code(&primary).ok()
    }

    /// Get the canonical (source) language.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    /// Get the ISO 639-1 language code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Never in practice: a `Language` can only be built from a registry entry.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn direction(&self) -> Direction {
        self.config().direction
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Language::from_code(&code).map_err(serde::de::Error::custom)
    }
}
