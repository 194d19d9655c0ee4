//! Language registry: Single source of truth for all supported languages.
//!
//! The registry is built once on first access and is immutable afterwards, so
//! it is safe to share across request handlers without locking.

use crate::i18n::Direction;
use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "ar")
    pub code: &'static str,

    /// English name of the language (e.g., "Arabic")
    pub name: &'static str,

    /// Native name of the language (e.g., "العربية")
    pub native_name: &'static str,

    /// Geographic region, used to derive region-qualified hreflang values
    pub region: &'static str,

    /// Text direction for layout
    pub direction: Direction,

    /// Whether this is the canonical/source language (only one should be true)
    pub is_canonical: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

/// Languages written right-to-left.
const RTL_CODES: &[&str] = &["ar", "he", "fa", "ur"];

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its exact code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages, in registry (priority) order.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get all languages (including disabled ones).
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// Get the canonical language configuration.
    ///
    /// # Panics
    /// Panics if the static table does not define exactly one canonical
    /// language. The table is compiled in, so this is a programming error.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }

    /// Codes of all enabled languages.
    pub fn enabled_codes(&self) -> Vec<&'static str> {
        self.languages
            .iter()
            .filter(|lang| lang.enabled)
            .map(|lang| lang.code)
            .collect()
    }
}

/// Static table: (code, English name, native name, region)
///
/// Ordered by rollout priority: UN official languages first, then major world
/// languages, then the long tail.
const LANGUAGE_TABLE: &[(&str, &str, &str, &str)] = &[
    ("en", "English", "English", "Global"),
    ("fr", "French", "Français", "Europe/Africa"),
    ("es", "Spanish", "Español", "Americas/Europe"),
    ("ar", "Arabic", "العربية", "Middle East"),
    ("zh", "Chinese", "中文", "East Asia"),
    ("ru", "Russian", "Русский", "Eastern Europe/Asia"),
    ("pt", "Portuguese", "Português", "Americas/Europe/Africa"),
    ("de", "German", "Deutsch", "Europe"),
    ("ja", "Japanese", "日本語", "East Asia"),
    ("hi", "Hindi", "हिन्दी", "South Asia"),
    ("it", "Italian", "Italiano", "Europe"),
    ("nl", "Dutch", "Nederlands", "Europe"),
    ("ko", "Korean", "한국어", "East Asia"),
    ("tr", "Turkish", "Türkçe", "Europe/Asia"),
    ("pl", "Polish", "Polski", "Europe"),
    ("bn", "Bengali", "বাংলা", "South Asia"),
    ("ur", "Urdu", "اردو", "South Asia"),
    ("fa", "Persian", "فارسی", "Middle East"),
    ("he", "Hebrew", "עברית", "Middle East"),
    ("sv", "Swedish", "Svenska", "Europe"),
    ("no", "Norwegian", "Norsk", "Europe"),
    ("da", "Danish", "Dansk", "Europe"),
    ("vi", "Vietnamese", "Tiếng Việt", "Southeast Asia"),
    ("th", "Thai", "ไทย", "Southeast Asia"),
    ("id", "Indonesian", "Bahasa Indonesia", "Southeast Asia"),
    ("ms", "Malay", "Bahasa Melayu", "Southeast Asia"),
    ("sw", "Swahili", "Kiswahili", "East Africa"),
    ("am", "Amharic", "አማርኛ", "East Africa"),
    ("yo", "Yoruba", "Yorùbá", "West Africa"),
    ("ha", "Hausa", "Hausa", "West Africa"),
    ("el", "Greek", "Ελληνικά", "Europe"),
    ("cs", "Czech", "Čeština", "Europe"),
    ("hu", "Hungarian", "Magyar", "Europe"),
    ("ro", "Romanian", "Română", "Europe"),
    ("bg", "Bulgarian", "Български", "Europe"),
    ("hr", "Croatian", "Hrvatski", "Europe"),
    ("sr", "Serbian", "Српски", "Europe"),
    ("sk", "Slovak", "Slovenčina", "Europe"),
    ("sl", "Slovenian", "Slovenščina", "Europe"),
    ("fi", "Finnish", "Suomi", "Europe"),
    ("is", "Icelandic", "Íslenska", "Europe"),
    ("ga", "Irish", "Gaeilge", "Europe"),
    ("cy", "Welsh", "Cymraeg", "Europe"),
    ("ca", "Catalan", "Català", "Europe"),
    ("eu", "Basque", "Euskara", "Europe"),
    ("gl", "Galician", "Galego", "Europe"),
    ("et", "Estonian", "Eesti", "Europe"),
    ("lv", "Latvian", "Latviešu", "Europe"),
    ("lt", "Lithuanian", "Lietuvių", "Europe"),
    ("mt", "Maltese", "Malti", "Europe"),
    ("sq", "Albanian", "Shqip", "Europe"),
];

fn default_languages() -> Vec<LanguageConfig> {
    LANGUAGE_TABLE
        .iter()
        .map(|&(code, name, native_name, region)| LanguageConfig {
            code,
            name,
            native_name,
            region,
            direction: if RTL_CODES.contains(&code) {
                Direction::Rtl
            } else {
                Direction::Ltr
            },
            is_canonical: code == "en",
            enabled: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_registry_has_fifty_one_languages() {
        assert_eq!(LanguageRegistry::get().list_all().len(), 51);
        assert_eq!(LanguageRegistry::get().list_enabled().len(), 51);
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes = LanguageRegistry::get().enabled_codes();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 51);
    }

    #[test]
    fn test_get_by_code_arabic() {
        let config = LanguageRegistry::get().get_by_code("ar").unwrap();
        assert_eq!(config.name, "Arabic");
        assert_eq!(config.direction, Direction::Rtl);
        assert!(!config.is_canonical);
    }

    #[test]
    fn test_rtl_set_is_exactly_four_languages() {
        let rtl: Vec<_> = LanguageRegistry::get()
            .list_all()
            .into_iter()
            .filter(|lang| lang.direction == Direction::Rtl)
            .map(|lang| lang.code)
            .collect();
        assert_eq!(rtl, vec!["ar", "ur", "fa", "he"]);
    }

    #[test]
    fn test_get_by_code_is_exact_match() {
        let registry = LanguageRegistry::get();
        assert!(registry.get_by_code("EN").is_none());
        assert!(registry.get_by_code("en-US").is_none());
        assert!(registry.get_by_code("xx").is_none());
    }

    #[test]
    fn test_canonical_returns_english() {
        let canonical = LanguageRegistry::get().canonical();
        assert_eq!(canonical.code, "en");
        assert_eq!(canonical.direction, Direction::Ltr);
    }

    #[test]
    fn test_is_enabled() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_enabled("fr"));
        assert!(registry.is_enabled("sq"));
        assert!(!registry.is_enabled("uk"));
        assert!(!registry.is_enabled(""));
    }
}
