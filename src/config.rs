use crate::i18n::{CachePolicy, Language, Namespace};
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Bundle store
    pub bundle_dir: String,
    pub bundle_base_url: Option<String>,

    // Languages
    pub default_language: Language,
    pub fallback_language: Language,
    pub namespaces: Vec<Namespace>,

    // Cache
    pub cache_ttl_secs: u64,
    pub cache_max_age_secs: u64,
    pub load_timeout_ms: u64,
    pub sweep_interval_secs: u64,
    pub persistent_cache_dir: Option<String>,

    // Analytics
    pub analytics_capacity: usize,
    pub alert_webhook_url: Option<String>,
    pub alert_interval_secs: u64,

    // Web server
    pub public_base_url: String,
    pub api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Bundle store
            bundle_dir: std::env::var("I18N_BUNDLE_DIR")
                .unwrap_or_else(|_| "public/locales".to_string()),
            bundle_base_url: optional_var("I18N_BUNDLE_BASE_URL"),

            // Languages
            default_language: language_var("I18N_DEFAULT_LANGUAGE")?,
            fallback_language: language_var("I18N_FALLBACK_LANGUAGE")?,
            namespaces: match optional_var("I18N_NAMESPACES") {
                Some(raw) => parse_namespaces(&raw).context("I18N_NAMESPACES is invalid")?,
                None => default_namespaces(),
            },

            // Cache
            cache_ttl_secs: parsed_var("I18N_CACHE_TTL_SECS", 3600)?,
            cache_max_age_secs: parsed_var("I18N_CACHE_MAX_AGE_SECS", 86_400)?,
            load_timeout_ms: parsed_var("I18N_LOAD_TIMEOUT_MS", 5000)?,
            sweep_interval_secs: parsed_var("I18N_SWEEP_INTERVAL_SECS", 600)?,
            persistent_cache_dir: optional_var("I18N_PERSISTENT_CACHE_DIR"),

            // Analytics
            analytics_capacity: parsed_var("ANALYTICS_CAPACITY", 10_000)?,
            alert_webhook_url: optional_var("ALERT_WEBHOOK_URL"),
            alert_interval_secs: parsed_var("ALERT_INTERVAL_SECS", 300)?,

            // Web server
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "https://baobabhope.org".to_string()),
            api_key: optional_var("API_KEY"),
            port: parsed_var("PORT", 8080)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make the cache or resolver misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.namespaces.is_empty() {
            anyhow::bail!("At least one namespace must be configured");
        }
        if self.cache_ttl_secs > self.cache_max_age_secs {
            anyhow::bail!(
                "Cache TTL ({}s) must not exceed the hard max age ({}s)",
                self.cache_ttl_secs,
                self.cache_max_age_secs
            );
        }
        if self.load_timeout_ms == 0 {
            anyhow::bail!("I18N_LOAD_TIMEOUT_MS must be greater than zero");
        }
        if self.sweep_interval_secs == 0 || self.alert_interval_secs == 0 {
            anyhow::bail!("Job intervals must be greater than zero");
        }
        if self.analytics_capacity == 0 {
            anyhow::bail!("ANALYTICS_CAPACITY must be greater than zero");
        }
        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            max_age: Duration::from_secs(self.cache_max_age_secs),
            load_timeout: Duration::from_millis(self.load_timeout_ms),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", name, raw)),
        None => Ok(default),
    }
}

fn language_var(name: &str) -> Result<Language> {
    match optional_var(name) {
        Some(code) => {
            Language::from_code(code.trim()).with_context(|| format!("{} is not supported", name))
        }
        None => Ok(Language::canonical()),
    }
}

fn default_namespaces() -> Vec<Namespace> {
    ["common", "navigation", "pages", "forms", "actions", "misc"]
        .iter()
        .filter_map(|name| Namespace::new(name))
        .collect()
}

fn parse_namespaces(raw: &str) -> Result<Vec<Namespace>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Namespace::new(name).with_context(|| format!("invalid namespace '{}'", name)))
        .collect()
}
