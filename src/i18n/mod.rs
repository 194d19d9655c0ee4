//! Internationalization (i18n) runtime: bundle loading, caching and key
//! resolution for every supported language.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for all supported languages and their metadata
//! - `language`: Validated `Language` type and text `Direction`
//! - `bundle`: Namespaces and the translation bundle tree
//! - `loader`: Filesystem and HTTP bundle sources
//! - `persistent`: Optional on-disk second cache tier
//! - `cache`: Process-wide resolution cache (stale-while-revalidate, coalesced loads)
//! - `resolver`: Key resolution with the fallback chain
//! - `locale`: Per-session language state and initial negotiation
//! - `urls`: Locale-prefixed paths, canonical and hreflang URLs
//! - `validator`: Bundle quality checks against the canonical language
//!
//! # Example
//!
//! ```rust,ignore
//! use baobab_i18n::i18n::{FsBundleLoader, Language, Namespace, ResolutionCache, ResolveOptions, Translator};
//!
//! let cache = ResolutionCache::builder(Arc::new(FsBundleLoader::new("public/locales"))).build();
//! let translator = Translator::new(cache, Language::canonical());
//! let nav = Namespace::new("navigation").unwrap();
//! let text = translator.resolve(Language::FRENCH, &nav, "nav.home", &ResolveOptions::new()).await;
//! ```

mod bundle;
mod cache;
mod language;
mod loader;
mod locale;
mod metrics;
mod persistent;
mod plural;
mod registry;
mod resolver;
mod urls;
mod validator;

pub use bundle::{is_reserved_key, Entry, Namespace, TranslationBundle, DEFAULT_BUNDLE_VERSION};
pub use cache::{
    CacheEntry, CacheEntryInfo, CachePolicy, PreloadSummary, ResolutionCache,
    ResolutionCacheBuilder, SweepSummary,
};
pub use language::{Direction, Language};
pub use loader::{BundleLoader, FsBundleLoader, HttpBundleLoader};
pub use locale::{
    negotiate, parse_accept_language, LocaleContext, LocaleHints, LocaleMetadata, SelectionSource,
    SwitchOutcome,
};
pub use metrics::{CacheStats, CacheStatsReport};
pub use persistent::{FsPersistentCache, PersistedBundle, PersistentCache, CACHE_VERSION};
pub use plural::{category as plural_category, PluralCategory};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use resolver::{interpolate, resolve_from, ResolveOptions, Resolved, Translator, MISSING_MARKER};
pub use urls::{locale_from_path, strip_locale, with_locale, Alternate, UrlScheme};
pub use validator::{TranslationValidator, ValidationReport};
