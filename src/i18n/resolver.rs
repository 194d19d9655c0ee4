//! Key resolution with a fallback chain.
//!
//! requested language -> fallback language -> caller default -> key path.
//! The result is never empty and resolution never fails.

use crate::analytics::{AnalyticsEvent, AnalyticsStore, ResolutionOutcome};
use crate::i18n::bundle::{Entry, Namespace, TranslationBundle};
use crate::i18n::cache::ResolutionCache;
use crate::i18n::plural::{self, PluralCategory};
use crate::i18n::Language;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Returned for an empty key path when no default is usable.
pub const MISSING_MARKER: &str = "???";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Returned instead of the key path when nothing is found. Empty is ignored.
    pub default: Option<String>,
    /// `{{name}}` substitutions
    pub vars: BTreeMap<String, String>,
    /// Selects a plural form and fills `{{count}}`
    pub count: Option<i64>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub text: String,
    pub outcome: ResolutionOutcome,
}

/// Resolves keys against the shared [`ResolutionCache`].
#[derive(Clone)]
pub struct Translator {
    cache: ResolutionCache,
    fallback: Language,
    analytics: AnalyticsStore,
}

impl Translator {
    /// Analytics go to the same store the cache reports to.
    pub fn new(cache: ResolutionCache, fallback: Language) -> Self {
        let analytics = cache.analytics().clone();
        Self {
            cache,
            fallback,
            analytics,
        }
    }

    pub fn fallback_language(&self) -> Language {
        self.fallback
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        language: Language,
        namespace: &Namespace,
        key: &str,
        options: &ResolveOptions,
    ) -> String {
        self.resolve_detailed(language, namespace, key, options)
            .await
            .text
    }

    /// Like [`resolve`](Self::resolve) but also reports how the value was found.
    pub async fn resolve_detailed(
        &self,
        language: Language,
        namespace: &Namespace,
        key: &str,
        options: &ResolveOptions,
    ) -> Resolved {
        let primary = self.bundle(language, namespace).await;
        let found = primary
            .as_deref()
            .and_then(|bundle| lookup_text(bundle, key, options.count));

        let resolved = match found {
            Some(text) => finish(text, options, ResolutionOutcome::Hit),
            None => {
                let fallback = self.fallback_bundle(language, namespace).await;
                resolve_in_fallback(fallback.as_deref(), key, options)
            }
        };

        self.report(language, namespace, key, &resolved);
        resolved
    }

    /// Resolve many keys, loading each bundle at most once.
    pub async fn resolve_batch<'k>(
        &self,
        language: Language,
        namespace: &Namespace,
        keys: impl IntoIterator<Item = &'k str>,
        options: &ResolveOptions,
    ) -> BTreeMap<String, String> {
        let primary = self.bundle(language, namespace).await;
        let mut fallback: Option<Option<Arc<TranslationBundle>>> = None;
        let mut results = BTreeMap::new();

        for key in keys {
            let found = primary
                .as_deref()
                .and_then(|bundle| lookup_text(bundle, key, options.count));
            let resolved = match found {
                Some(text) => finish(text, options, ResolutionOutcome::Hit),
                None => {
                    if fallback.is_none() {
                        fallback = Some(self.fallback_bundle(language, namespace).await);
                    }
                    let bundle = fallback.as_ref().and_then(|b| b.as_deref());
                    resolve_in_fallback(bundle, key, options)
                }
            };
            self.report(language, namespace, key, &resolved);
            results.insert(key.to_string(), resolved.text);
        }

        results
    }

    /// Synchronous variant: consults only bundles already in the cache.
    pub fn resolve_cached(
        &self,
        language: Language,
        namespace: &Namespace,
        key: &str,
        options: &ResolveOptions,
    ) -> String {
        let primary = self
            .cache
            .peek(language, namespace)
            .map(|entry| Arc::clone(&entry.bundle));
        let found = primary
            .as_deref()
            .and_then(|bundle| lookup_text(bundle, key, options.count));

        let resolved = match found {
            Some(text) => finish(text, options, ResolutionOutcome::Hit),
            None => {
                let fallback = if language == self.fallback {
                    None
                } else {
                    self.cache
                        .peek(self.fallback, namespace)
                        .map(|entry| Arc::clone(&entry.bundle))
                };
                resolve_in_fallback(fallback.as_deref(), key, options)
            }
        };

        self.report(language, namespace, key, &resolved);
        resolved.text
    }

    async fn bundle(
        &self,
        language: Language,
        namespace: &Namespace,
    ) -> Option<Arc<TranslationBundle>> {
        self.cache
            .get(language, namespace)
            .await
            .map(|entry| Arc::clone(&entry.bundle))
    }

    async fn fallback_bundle(
        &self,
        language: Language,
        namespace: &Namespace,
    ) -> Option<Arc<TranslationBundle>> {
        if language == self.fallback {
            return None;
        }
        self.bundle(self.fallback, namespace).await
    }

    fn report(&self, language: Language, namespace: &Namespace, key: &str, resolved: &Resolved) {
        if resolved.outcome == ResolutionOutcome::Miss {
            debug!(
                language = %language,
                namespace = %namespace,
                key = key,
                "Translation missing, rendering '{}'",
                resolved.text
            );
        }
        self.analytics.record(AnalyticsEvent::resolution(
            language.code(),
            namespace.as_str(),
            key,
            resolved.outcome,
        ));
    }
}

fn resolve_in_fallback(
    fallback: Option<&TranslationBundle>,
    key: &str,
    options: &ResolveOptions,
) -> Resolved {
    match fallback.and_then(|bundle| lookup_text(bundle, key, options.count)) {
        Some(text) => finish(text, options, ResolutionOutcome::FallbackHit),
        None => Resolved {
            text: last_resort(key, options),
            outcome: ResolutionOutcome::Miss,
        },
    }
}

/// Resolve `key` against already-available bundles without touching a cache.
pub fn resolve_from(
    primary: Option<&TranslationBundle>,
    fallback: Option<&TranslationBundle>,
    key: &str,
    options: &ResolveOptions,
) -> Resolved {
    match primary.and_then(|bundle| lookup_text(bundle, key, options.count)) {
        Some(text) => finish(text, options, ResolutionOutcome::Hit),
        None => resolve_in_fallback(fallback, key, options),
    }
}

fn finish(template: &str, options: &ResolveOptions, outcome: ResolutionOutcome) -> Resolved {
    Resolved {
        text: apply_vars(template, options),
        outcome,
    }
}

fn last_resort(key: &str, options: &ResolveOptions) -> String {
    match options.default.as_deref().filter(|d| !d.is_empty()) {
        Some(default) => apply_vars(default, options),
        None if key.is_empty() => MISSING_MARKER.to_string(),
        None => key.to_string(),
    }
}

fn apply_vars(template: &str, options: &ResolveOptions) -> String {
    match options.count {
        Some(count) if !options.vars.contains_key("count") => {
            let mut vars = options.vars.clone();
            vars.insert("count".to_string(), count.to_string());
            interpolate(template, &vars)
        }
        _ => interpolate(template, &options.vars),
    }
}

/// Find a usable string for `key`. Empty strings count as missing.
fn lookup_text<'a>(bundle: &'a TranslationBundle, key: &str, count: Option<i64>) -> Option<&'a str> {
    match bundle.lookup(key)? {
        Entry::Text(text) if !text.is_empty() => Some(text),
        Entry::Node(forms) => {
            let count = count?;
            let wanted = plural::category(bundle.language, count);
            [wanted, PluralCategory::Other]
                .iter()
                .filter_map(|category| forms.get(category.key()))
                .filter_map(Entry::as_text)
                .find(|text| !text.is_empty())
        }
        _ => None,
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"))
}

/// Replace `{{name}}` placeholders. Unknown names are left as written.
pub fn interpolate(template: &str, vars: &BTreeMap<String, String>) -> String {
    if vars.is_empty() || !template.contains("{{") {
        return template.to_string();
    }
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholder names used in `text`.
pub fn placeholders(text: &str) -> BTreeSet<String> {
    placeholder_regex()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{EventKind, TimeWindow};
    use serde_json::json;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    fn bundle(language: Language, namespace: &str, doc: serde_json::Value) -> TranslationBundle {
        TranslationBundle::parse(
            "test",
            language,
            &ns(namespace),
            doc.to_string().as_bytes(),
        )
        .unwrap()
    }

    fn english() -> TranslationBundle {
        bundle(
            Language::ENGLISH,
            "navigation",
            json!({
                "nav": {"home": "Home", "about": "About us", "blank": ""},
                "greeting": "Hello, {{name}}!",
                "donors": {"one": "{{count}} donor", "other": "{{count}} donors"},
                "links": ["a", "b"]
            }),
        )
    }

    fn french() -> TranslationBundle {
        bundle(
            Language::FRENCH,
            "navigation",
            json!({
                "nav": {"home": "Accueil", "about": ""},
                "donors": {"one": "{{count}} donateur", "other": "{{count}} donateurs"}
            }),
        )
    }

    // ==================== Fallback Chain Tests ====================

    #[test]
    fn test_hit_in_requested_language() {
        let fr = french();
        let en = english();
        let resolved = resolve_from(Some(&fr), Some(&en), "nav.home", &ResolveOptions::new());
        assert_eq!(resolved.text, "Accueil");
        assert_eq!(resolved.outcome, ResolutionOutcome::Hit);
    }

    #[test]
    fn test_empty_leaf_falls_back() {
        let fr = french();
        let en = english();
        let resolved = resolve_from(Some(&fr), Some(&en), "nav.about", &ResolveOptions::new());
        assert_eq!(resolved.text, "About us");
        assert_eq!(resolved.outcome, ResolutionOutcome::FallbackHit);
    }

    #[test]
    fn test_missing_bundle_uses_fallback() {
        let en = english();
        let resolved = resolve_from(None, Some(&en), "nav.home", &ResolveOptions::new());
        assert_eq!(resolved.text, "Home");
    }

    #[test]
    fn test_miss_returns_key_then_default() {
        let en = english();
        let options = ResolveOptions::new();
        assert_eq!(
            resolve_from(None, Some(&en), "nav.missing", &options).text,
            "nav.missing"
        );
        let options = ResolveOptions::new().with_default("Missing page");
        let resolved = resolve_from(None, Some(&en), "nav.missing", &options);
        assert_eq!(resolved.text, "Missing page");
        assert_eq!(resolved.outcome, ResolutionOutcome::Miss);
    }

    #[test]
    fn test_empty_default_and_empty_key() {
        let options = ResolveOptions::new().with_default("");
        assert_eq!(resolve_from(None, None, "a.b", &options).text, "a.b");
        assert_eq!(resolve_from(None, None, "", &options).text, MISSING_MARKER);
        assert_eq!(resolve_from(None, None, "", &ResolveOptions::new()).text, "???");
    }

    #[test]
    fn test_non_string_leaves_are_not_text() {
        let en = english();
        let options = ResolveOptions::new();
        assert_eq!(resolve_from(Some(&en), None, "links", &options).text, "links");
        assert_eq!(resolve_from(Some(&en), None, "nav", &options).text, "nav");
        assert_eq!(resolve_from(Some(&en), None, "nav.blank", &options).text, "nav.blank");
    }

    // ==================== Interpolation Tests ====================

    #[test]
    fn test_interpolation() {
        let en = english();
        let options = ResolveOptions::new().with_var("name", "Amina");
        assert_eq!(
            resolve_from(Some(&en), None, "greeting", &options).text,
            "Hello, Amina!"
        );
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        let en = english();
        let options = ResolveOptions::new().with_var("other", "x");
        assert_eq!(
            resolve_from(Some(&en), None, "greeting", &options).text,
            "Hello, {{name}}!"
        );
    }

    #[test]
    fn test_interpolate_tolerates_spaces_and_junk() {
        let mut vars = BTreeMap::new();
        vars.insert("n".to_string(), "3".to_string());
        assert_eq!(interpolate("{{ n }} / {{n}} / {{", &vars), "3 / 3 / {{");
        assert_eq!(interpolate("{{}}", &vars), "{{}}");
    }

    #[test]
    fn test_placeholders() {
        let names: Vec<_> = placeholders("{{a}} and {{ b }} and {{a}}").into_iter().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    // ==================== Plural Tests ====================

    #[test]
    fn test_plural_selection_by_language() {
        let en = english();
        let fr = french();
        assert_eq!(
            resolve_from(Some(&en), None, "donors", &ResolveOptions::new().with_count(1)).text,
            "1 donor"
        );
        assert_eq!(
            resolve_from(Some(&en), None, "donors", &ResolveOptions::new().with_count(0)).text,
            "0 donors"
        );
        // French treats zero as singular
        assert_eq!(
            resolve_from(Some(&fr), None, "donors", &ResolveOptions::new().with_count(0)).text,
            "0 donateur"
        );
    }

    #[test]
    fn test_plural_missing_category_uses_other() {
        let ar = bundle(
            Language::ARABIC,
            "navigation",
            json!({"donors": {"other": "{{count}} متبرع"}}),
        );
        let resolved = resolve_from(Some(&ar), None, "donors", &ResolveOptions::new().with_count(2));
        assert_eq!(resolved.text, "2 متبرع");
    }

    #[test]
    fn test_plural_node_without_count_is_missing() {
        let en = english();
        assert_eq!(
            resolve_from(Some(&en), None, "donors", &ResolveOptions::new()).text,
            "donors"
        );
    }

    // ==================== Translator Tests ====================

    mod translator {
        use super::*;
        use crate::error::LoadError;
        use crate::i18n::loader::BundleLoader;
        use async_trait::async_trait;
        use std::collections::HashMap;

        struct MapLoader(HashMap<(Language, String), TranslationBundle>);

        #[async_trait]
        impl BundleLoader for MapLoader {
            fn source_id(&self, language: Language, namespace: &Namespace) -> String {
                format!("map://{}/{}", language, namespace)
            }

            async fn load(
                &self,
                language: Language,
                namespace: &Namespace,
            ) -> Result<TranslationBundle, LoadError> {
                self.0
                    .get(&(language, namespace.to_string()))
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound {
                        source_id: self.source_id(language, namespace),
                    })
            }
        }

        fn translator() -> Translator {
            let mut bundles = HashMap::new();
            bundles.insert((Language::ENGLISH, "navigation".to_string()), english());
            bundles.insert((Language::FRENCH, "navigation".to_string()), french());
            let cache = ResolutionCache::builder(Arc::new(MapLoader(bundles))).build();
            Translator::new(cache, Language::ENGLISH)
        }

        #[tokio::test]
        async fn test_resolve_loads_through_cache() {
            let t = translator();
            let nav = ns("navigation");
            let opts = ResolveOptions::new();

            assert_eq!(t.resolve(Language::FRENCH, &nav, "nav.home", &opts).await, "Accueil");
            assert_eq!(t.resolve(Language::SPANISH, &nav, "nav.home", &opts).await, "Home");
            assert_eq!(
                t.resolve(Language::SPANISH, &nav, "nav.missing", &opts).await,
                "nav.missing"
            );
        }

        #[tokio::test]
        async fn test_resolution_outcomes_are_recorded() {
            let t = translator();
            let nav = ns("navigation");
            let opts = ResolveOptions::new();
            t.resolve(Language::FRENCH, &nav, "nav.home", &opts).await;
            t.resolve(Language::FRENCH, &nav, "nav.about", &opts).await;
            t.resolve(Language::FRENCH, &nav, "nope", &opts).await;

            let outcomes: Vec<_> = t
                .cache()
                .analytics()
                .events_of(EventKind::Resolution, &TimeWindow::all())
                .into_iter()
                .filter_map(|e| e.outcome)
                .collect();
            assert_eq!(
                outcomes,
                vec![
                    ResolutionOutcome::Hit,
                    ResolutionOutcome::FallbackHit,
                    ResolutionOutcome::Miss
                ]
            );
        }

        #[tokio::test]
        async fn test_batch_resolution() {
            let t = translator();
            let nav = ns("navigation");
            let results = t
                .resolve_batch(
                    Language::FRENCH,
                    &nav,
                    ["nav.home", "nav.about", "nav.gone"],
                    &ResolveOptions::new(),
                )
                .await;

            assert_eq!(results.len(), 3);
            assert_eq!(results["nav.home"], "Accueil");
            assert_eq!(results["nav.about"], "About us");
            assert_eq!(results["nav.gone"], "nav.gone");
        }

        #[tokio::test]
        async fn test_resolve_cached_never_loads() {
            let t = translator();
            let nav = ns("navigation");
            let opts = ResolveOptions::new();

            assert_eq!(t.resolve_cached(Language::FRENCH, &nav, "nav.home", &opts), "nav.home");
            t.cache().preload(Language::FRENCH).await;
            t.cache().get(Language::FRENCH, &nav).await;
            assert_eq!(t.resolve_cached(Language::FRENCH, &nav, "nav.home", &opts), "Accueil");
        }
    }
}
