//! Per-session locale state: current language, derived direction, and URL
//! metadata.
//!
//! A context is created once per request or session and only changes through
//! [`LocaleContext::switch_language`]. Rejected input leaves it untouched.

use crate::analytics::{AnalyticsEvent, AnalyticsStore};
use crate::error::LocaleError;
use crate::i18n::cache::{PreloadSummary, ResolutionCache};
use crate::i18n::urls::{Alternate, UrlScheme};
use crate::i18n::{Direction, Language};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Where the initial language came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Persisted,
    Browser,
    Default,
}

impl SelectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionSource::Persisted => "persisted",
            SelectionSource::Browser => "browser",
            SelectionSource::Default => "default",
        }
    }
}

/// Inputs available when a session starts.
#[derive(Debug, Clone, Default)]
pub struct LocaleHints {
    /// Stored preference (cookie, local storage). Must be an exact code.
    pub persisted: Option<String>,
    /// Raw `Accept-Language` header
    pub accept_language: Option<String>,
    pub session_id: Option<String>,
}

/// Supported languages from an `Accept-Language` header, best first.
///
/// Ties keep header order; `q=0` entries, unparsable or out-of-range q-values
/// and unsupported tags are dropped.
pub fn parse_accept_language(header: &str) -> Vec<Language> {
    let mut weighted: Vec<(usize, f32, Language)> = header
        .split(',')
        .enumerate()
        .filter_map(|(position, part)| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            let quality = pieces
                .filter_map(|param| param.trim().strip_prefix("q="))
                .next()
                .map(|q| {
                    q.trim()
                        .parse::<f32>()
                        .ok()
                        .filter(|q| q.is_finite() && (0.0..=1.0).contains(q))
                        .unwrap_or(0.0)
                })
                .unwrap_or(1.0);
            if quality <= 0.0 {
                return None;
            }
            Language::from_tag(tag).map(|language| (position, quality, language))
        })
        .collect();

    weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut languages = Vec::new();
    for (_, _, language) in weighted {
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    languages
}

/// Pick the initial language: persisted preference, then browser, then default.
/// First match wins.
pub fn negotiate(hints: &LocaleHints, default: Language) -> (Language, SelectionSource) {
    if let Some(language) = hints
        .persisted
        .as_deref()
        .and_then(|code| Language::from_code(code).ok())
    {
        return (language, SelectionSource::Persisted);
    }

    if let Some(language) = hints
        .accept_language
        .as_deref()
        .and_then(|header| parse_accept_language(header).into_iter().next())
    {
        return (language, SelectionSource::Browser);
    }

    (default, SelectionSource::Default)
}

/// Result of an accepted switch.
#[derive(Debug)]
pub struct SwitchOutcome {
    pub from: Language,
    pub to: Language,
    /// Background preload of the new language, when one was started
    pub preload: Option<JoinHandle<PreloadSummary>>,
}

impl SwitchOutcome {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Everything a layout needs to render a page in the current locale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleMetadata {
    pub language: Language,
    pub name: &'static str,
    pub native_name: &'static str,
    pub direction: Direction,
    /// Value for `<html lang>`
    pub lang_attr: &'static str,
    /// Value for `<html dir>`
    pub dir_attr: &'static str,
    pub path: String,
    pub canonical_url: String,
    pub alternates: Vec<Alternate>,
}

pub struct LocaleContext {
    current: Language,
    cache: ResolutionCache,
    analytics: AnalyticsStore,
    urls: UrlScheme,
    session_id: Option<String>,
}

impl LocaleContext {
    /// Context starting in `language`, without recording a selection.
    pub fn new(language: Language, cache: ResolutionCache, urls: UrlScheme) -> Self {
        let analytics = cache.analytics().clone();
        Self {
            current: language,
            cache,
            analytics,
            urls,
            session_id: None,
        }
    }

    /// Negotiate the initial language and record the selection.
    pub fn initialize(cache: ResolutionCache, urls: UrlScheme, hints: &LocaleHints) -> (Self, SelectionSource) {
        let mut context = Self::new(urls.default_language(), cache, urls);
        context.session_id = hints.session_id.clone();

        if let Some(code) = hints.persisted.as_deref() {
            if Language::from_code(code).is_err() {
                warn!("Ignoring unsupported persisted language preference '{}'", code);
                context.record(AnalyticsEvent::validation_error(code, "unsupported persisted preference"));
            }
        }

        let (language, source) = negotiate(hints, context.urls.default_language());
        context.current = language;
        debug!("Initial language {} from {}", language, source.as_str());
        context.record(AnalyticsEvent::selection(language.code(), source.as_str()));

        (context, source)
    }

    pub fn current_language(&self) -> Language {
        self.current
    }

    pub fn direction(&self) -> Direction {
        self.current.direction()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Switch to `code`, which must be an exact supported code.
    ///
    /// An accepted switch starts a background preload of the new language when
    /// called inside a Tokio runtime. Switching to the current language only
    /// re-emits the switch event.
    pub fn switch_language(&mut self, code: &str) -> Result<SwitchOutcome, LocaleError> {
        let to = match Language::from_code(code) {
            Ok(language) => language,
            Err(e) => {
                warn!(
                    "Rejected language switch to '{}', staying on {}",
                    code, self.current
                );
                self.record(AnalyticsEvent::validation_error(code, "unsupported language"));
                return Err(e);
            }
        };

        let from = self.current;
        self.record(AnalyticsEvent::switch(from.code(), to.code()));
        if from == to {
            return Ok(SwitchOutcome {
                from,
                to,
                preload: None,
            });
        }

        self.current = to;
        debug!("Switched language {} -> {} ({})", from, to, to.direction());

        let preload = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let cache = self.cache.clone();
            handle.spawn(async move { cache.preload(to).await })
        });

        Ok(SwitchOutcome { from, to, preload })
    }

    /// Record a page view in the current language.
    pub fn page_view(&self, page: &str) {
        self.record(AnalyticsEvent::page_view(self.current.code(), page));
    }

    pub fn metadata(&self, path: &str) -> LocaleMetadata {
        let language = self.current;
        let direction = language.direction();
        LocaleMetadata {
            language,
            name: language.name(),
            native_name: language.native_name(),
            direction,
            lang_attr: language.code(),
            dir_attr: direction.as_str(),
            path: crate::i18n::urls::with_locale(path, language),
            canonical_url: self.urls.canonical_url(path),
            alternates: self.urls.alternates(path),
        }
    }

    fn record(&self, event: AnalyticsEvent) {
        let event = match self.session_id.as_deref() {
            Some(session) => event.with_session(session),
            None => event,
        };
        self.analytics.record(event);
    }
}
