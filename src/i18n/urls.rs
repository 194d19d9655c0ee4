//! Locale-prefixed URL paths, canonical URLs and hreflang alternates.
//!
//! Paths have the shape `/{lang}/rest/of/path`. A leading segment counts as a
//! locale only if it is an enabled registry code.

use crate::i18n::{Language, LanguageRegistry};
use serde::Serialize;

/// One `<link rel="alternate" hreflang=..>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternate {
    pub hreflang: String,
    pub href: String,
}

/// Locale named by the first path segment, if any.
pub fn locale_from_path(path: &str) -> Option<Language> {
    let segment = path.trim_start_matches('/').split('/').next()?;
    Language::from_code(segment).ok()
}

/// Remove a leading locale segment. Always returns a path starting with `/`.
pub fn strip_locale(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let mut segments = trimmed.splitn(2, '/');
    let first = segments.next().unwrap_or_default();

    if Language::from_code(first).is_ok() {
        format!("/{}", segments.next().unwrap_or_default())
    } else {
        format!("/{}", trimmed)
    }
}

/// Replace any locale prefix with `language`.
pub fn with_locale(path: &str, language: Language) -> String {
    let clean = strip_locale(path);
    if clean == "/" {
        format!("/{}", language)
    } else {
        format!("/{}{}", language, clean)
    }
}

/// hreflang region suffix for a registry region name.
fn region_code(region: &str) -> Option<&'static str> {
    let code = match region {
        "Europe" => "EU",
        "Americas" => "US",
        "East Asia" => "CN",
        "Southeast Asia" => "SG",
        "South Asia" => "IN",
        "Middle East" => "AE",
        "North Africa" => "EG",
        "West Africa" => "NG",
        "East Africa" => "KE",
        "Europe/Africa" => "FR",
        "Europe/Asia" => "TR",
        "Eastern Europe/Asia" => "RU",
        "Americas/Europe" => "ES",
        "Americas/Europe/Africa" => "PT",
        _ => return None,
    };
    Some(code)
}

/// Builds absolute URLs for one site origin.
#[derive(Debug, Clone)]
pub struct UrlScheme {
    base_url: String,
    default_language: Language,
}

impl UrlScheme {
    pub fn new(base_url: &str, default_language: Language) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_language,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    pub fn localized_url(&self, path: &str, language: Language) -> String {
        format!("{}{}", self.base_url, with_locale(path, language))
    }

    /// The default-language URL for the page at `path`.
    pub fn canonical_url(&self, path: &str) -> String {
        self.localized_url(path, self.default_language)
    }

    /// Every enabled language, its region-qualified variant where one
    /// exists, and `x-default`.
    pub fn alternates(&self, path: &str) -> Vec<Alternate> {
        let clean = strip_locale(path);
        let mut links = Vec::new();

        for config in LanguageRegistry::get().list_enabled() {
            let href = format!("{}{}", self.base_url, localized_path(&clean, config.code));
            if let Some(region) = region_code(config.region) {
                links.push(Alternate {
                    hreflang: config.code.to_string(),
                    href: href.clone(),
                });
                links.push(Alternate {
                    hreflang: format!("{}-{}", config.code, region),
                    href,
                });
            } else {
                links.push(Alternate {
                    hreflang: config.code.to_string(),
                    href,
                });
            }
        }

        links.push(Alternate {
            hreflang: "x-default".to_string(),
            href: self.canonical_url(&clean),
        });
        links
    }

    /// One URL per enabled language, for sitemap generation.
    pub fn sitemap_alternates(&self, path: &str) -> Vec<Alternate> {
        let clean = strip_locale(path);
        LanguageRegistry::get()
            .list_enabled()
            .into_iter()
            .map(|config| Alternate {
                hreflang: config.code.to_string(),
                href: format!("{}{}", self.base_url, localized_path(&clean, config.code)),
            })
            .collect()
    }
}

fn localized_path(clean: &str, code: &str) -> String {
    if clean == "/" {
        format!("/{}", code)
    } else {
        format!("/{}{}", code, clean)
    }
}
