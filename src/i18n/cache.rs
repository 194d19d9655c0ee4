//! Process-wide resolution cache.
//!
//! Cache-first with background refresh: a stale entry is returned immediately
//! and a reload is scheduled; if the reload fails the stale entry stays
//! authoritative. Concurrent misses for one (language, namespace) share a
//! single loader call.
//!
//! Locking is per key. The outer map lock is only held long enough to find or
//! create a key's slot, so loads for unrelated keys never serialise.

use crate::analytics::{AnalyticsEvent, AnalyticsStore};
use crate::error::LoadError;
use crate::i18n::bundle::{Namespace, TranslationBundle};
use crate::i18n::loader::BundleLoader;
use crate::i18n::metrics::{CacheStats, CacheStatsReport};
use crate::i18n::persistent::PersistentCache;
use crate::i18n::Language;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Freshness and deadline policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age after which an entry is served stale and refreshed
    pub ttl: Duration,
    /// Age after which an entry is evicted regardless of use
    pub max_age: Duration,
    /// Deadline for a single loader call
    pub load_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_age: Duration::from_secs(24 * 60 * 60),
            load_timeout: Duration::from_secs(5),
        }
    }
}

/// A cached bundle plus bookkeeping.
#[derive(Debug)]
pub struct CacheEntry {
    pub bundle: Arc<TranslationBundle>,
    pub loaded_at: DateTime<Utc>,
    pub ttl: Duration,
    hits: AtomicU64,
}

impl CacheEntry {
    fn new(bundle: Arc<TranslationBundle>, loaded_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            bundle,
            loaded_at,
            ttl,
            hits: AtomicU64::new(0),
        }
    }

    /// Always the bundle's own language.
    pub fn language(&self) -> Language {
        self.bundle.language
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.loaded_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Diagnostic view of one cached key.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub language: Language,
    pub namespace: Namespace,
    pub version: String,
    pub age_secs: u64,
    pub hits: u64,
    pub stale: bool,
}

/// Result of preloading every configured namespace for a language.
#[derive(Debug, Clone, Serialize)]
pub struct PreloadSummary {
    pub language: Language,
    pub loaded: Vec<Namespace>,
    /// Namespace and error kind
    pub failed: Vec<(Namespace, String)>,
}

impl PreloadSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub memory: usize,
    pub persistent: usize,
}

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<CacheEntry>, LoadError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    /// Nothing cached: the persistent tier may answer
    Miss,
    /// Stale entry present: go straight to the loader
    Refresh,
}

#[derive(Default)]
struct Slot {
    entry: RwLock<Option<Arc<CacheEntry>>>,
    inflight: Mutex<Option<(u64, LoadFuture)>>,
    /// Bumped by put and invalidation; a load only publishes if unchanged
    epoch: AtomicU64,
}

impl Slot {
    fn current(&self) -> Option<Arc<CacheEntry>> {
        self.entry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set(&self, entry: Option<Arc<CacheEntry>>) -> Option<Arc<CacheEntry>> {
        let mut guard = self.entry.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, entry)
    }

    fn inflight(&self) -> MutexGuard<'_, Option<(u64, LoadFuture)>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

type SlotKey = (Language, Namespace);

struct CacheInner {
    slots: RwLock<HashMap<SlotKey, Arc<Slot>>>,
    loader: Arc<dyn BundleLoader>,
    persistent: Option<Arc<dyn PersistentCache>>,
    policy: CachePolicy,
    namespaces: Vec<Namespace>,
    stats: CacheStats,
    analytics: AnalyticsStore,
    next_load_id: AtomicU64,
}

/// Shared handle; clones refer to the same cache.
#[derive(Clone)]
pub struct ResolutionCache {
    inner: Arc<CacheInner>,
}

pub struct ResolutionCacheBuilder {
    loader: Arc<dyn BundleLoader>,
    persistent: Option<Arc<dyn PersistentCache>>,
    policy: CachePolicy,
    namespaces: Vec<Namespace>,
    analytics: AnalyticsStore,
}

impl ResolutionCacheBuilder {
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn persistent(mut self, persistent: Arc<dyn PersistentCache>) -> Self {
        self.persistent = Some(persistent);
        self
    }

    /// Namespaces loaded by [`ResolutionCache::preload`].
    pub fn namespaces(mut self, namespaces: Vec<Namespace>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn analytics(mut self, analytics: AnalyticsStore) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn build(self) -> ResolutionCache {
        ResolutionCache {
            inner: Arc::new(CacheInner {
                slots: RwLock::new(HashMap::new()),
                loader: self.loader,
                persistent: self.persistent,
                policy: self.policy,
                namespaces: self.namespaces,
                stats: CacheStats::new(),
                analytics: self.analytics,
                next_load_id: AtomicU64::new(0),
            }),
        }
    }
}

impl ResolutionCache {
    pub fn builder(loader: Arc<dyn BundleLoader>) -> ResolutionCacheBuilder {
        ResolutionCacheBuilder {
            loader,
            persistent: None,
            policy: CachePolicy::default(),
            namespaces: Namespace::defaults(),
            analytics: AnalyticsStore::default(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.inner.policy
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.inner.namespaces
    }

    pub fn analytics(&self) -> &AnalyticsStore {
        &self.inner.analytics
    }

    fn slot(&self, language: Language, namespace: &Namespace) -> Arc<Slot> {
        let key = (language, namespace.clone());
        if let Some(slot) = self
            .inner
            .slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.inner.slots.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key).or_default())
    }

    fn existing_slot(&self, language: Language, namespace: &Namespace) -> Option<Arc<Slot>> {
        self.inner
            .slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(language, namespace.clone()))
            .cloned()
    }

    fn all_slots(&self) -> Vec<(SlotKey, Arc<Slot>)> {
        self.inner
            .slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
            .collect()
    }

    /// Return the cached entry without loading. Never blocks on I/O.
    ///
    /// A stale entry is still returned; a refresh is scheduled when called
    /// from within a Tokio runtime.
    pub fn peek(&self, language: Language, namespace: &Namespace) -> Option<Arc<CacheEntry>> {
        let slot = self.existing_slot(language, namespace)?;
        let entry = slot.current()?;
        self.on_hit(language, namespace, &slot, &entry);
        Some(entry)
    }

    /// Cached entry, loading it on a miss. Load failures become `None`.
    pub async fn get(&self, language: Language, namespace: &Namespace) -> Option<Arc<CacheEntry>> {
        self.try_get(language, namespace).await.ok()
    }

    /// Like [`get`](Self::get) but reports why nothing is available.
    pub async fn try_get(
        &self,
        language: Language,
        namespace: &Namespace,
    ) -> Result<Arc<CacheEntry>, LoadError> {
        let slot = self.slot(language, namespace);
        if let Some(entry) = slot.current() {
            self.on_hit(language, namespace, &slot, &entry);
            return Ok(entry);
        }

        self.inner.stats.record_miss();
        let (load, _) = self.load_shared(language, namespace, &slot, LoadMode::Miss);
        let entry = load.await?;

        // Served from an old persistent copy
        if entry.is_stale(Utc::now()) {
            self.inner.stats.record_stale_served();
            self.schedule_refresh(language, namespace, &slot);
        }
        Ok(entry)
    }

    fn on_hit(&self, language: Language, namespace: &Namespace, slot: &Arc<Slot>, entry: &CacheEntry) {
        entry.hits.fetch_add(1, Ordering::Relaxed);
        self.inner.stats.record_hit();
        if entry.is_stale(Utc::now()) {
            self.inner.stats.record_stale_served();
            self.schedule_refresh(language, namespace, slot);
        }
    }

    fn schedule_refresh(&self, language: Language, namespace: &Namespace, slot: &Arc<Slot>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let (load, started) = self.load_shared(language, namespace, slot, LoadMode::Refresh);
        if started {
            debug!("Refreshing stale bundle {}/{}", language, namespace);
            self.inner.stats.record_refresh();
            handle.spawn(async move {
                // Failure already logged; the stale entry keeps serving
                let _ = load.await;
            });
        }
    }

    /// Join the in-flight load for this key or start one.
    ///
    /// Returns the shared future and whether this call started it.
    fn load_shared(
        &self,
        language: Language,
        namespace: &Namespace,
        slot: &Arc<Slot>,
        mode: LoadMode,
    ) -> (LoadFuture, bool) {
        let mut inflight = slot.inflight();
        if let Some((_, load)) = inflight.as_ref() {
            return (load.clone(), false);
        }

        // A load may have published between the caller's check and now
        if mode == LoadMode::Miss {
            if let Some(entry) = slot.current() {
                let ready: BoxFuture<'static, _> = future::ready(Ok(entry)).boxed();
                return (ready.shared(), false);
            }
        }

        let id = self.inner.next_load_id.fetch_add(1, Ordering::Relaxed);
        let epoch = slot.epoch.load(Ordering::Acquire);
        let inner = Arc::clone(&self.inner);
        let slot_ref = Arc::clone(slot);
        let namespace = namespace.clone();

        let load = async move {
            let outcome = inner
                .fetch(language, &namespace, mode)
                .await
                .map(|(bundle, loaded_at)| {
                    let entry = Arc::new(CacheEntry::new(bundle, loaded_at, inner.policy.ttl));
                    if slot_ref.epoch.load(Ordering::Acquire) == epoch {
                        slot_ref.set(Some(Arc::clone(&entry)));
                    } else {
                        debug!(
                            "Discarding load of {}/{} superseded by invalidation",
                            language, namespace
                        );
                    }
                    entry
                });

            let mut inflight = slot_ref.inflight();
            if matches!(inflight.as_ref(), Some((current, _)) if *current == id) {
                *inflight = None;
            }
            outcome
        }
        .boxed()
        .shared();

        *inflight = Some((id, load.clone()));
        (load, true)
    }

    /// Insert a bundle directly, replacing any cached entry.
    pub fn put(
        &self,
        language: Language,
        namespace: &Namespace,
        bundle: TranslationBundle,
        ttl: Duration,
    ) -> Result<(), LoadError> {
        if bundle.language != language || &bundle.namespace != namespace {
            return Err(LoadError::IntegrityMismatch {
                source_id: "put".to_string(),
                field: if bundle.language != language {
                    "language"
                } else {
                    "namespace"
                },
                requested: format!("{}/{}", language, namespace),
                declared: format!("{}/{}", bundle.language, bundle.namespace),
            });
        }

        let slot = self.slot(language, namespace);
        slot.epoch.fetch_add(1, Ordering::AcqRel);
        slot.set(Some(Arc::new(CacheEntry::new(
            Arc::new(bundle),
            Utc::now(),
            ttl,
        ))));
        Ok(())
    }

    /// Drop one key. Returns whether an entry was removed.
    pub fn invalidate(&self, language: Language, namespace: &Namespace) -> bool {
        match self.existing_slot(language, namespace) {
            Some(slot) => self.evict(&slot),
            None => false,
        }
    }

    /// Drop every namespace of one language.
    pub fn invalidate_language(&self, language: Language) -> usize {
        let removed = self
            .all_slots()
            .into_iter()
            .filter(|((lang, _), _)| *lang == language)
            .filter(|(_, slot)| self.evict(slot))
            .count();
        info!("Invalidated {} cached bundle(s) for {}", removed, language);
        removed
    }

    pub fn invalidate_all(&self) -> usize {
        let removed = self
            .all_slots()
            .into_iter()
            .filter(|(_, slot)| self.evict(slot))
            .count();
        info!("Invalidated all {} cached bundle(s)", removed);
        removed
    }

    fn evict(&self, slot: &Slot) -> bool {
        slot.epoch.fetch_add(1, Ordering::AcqRel);
        // Later misses must not join a load that will no longer publish
        *slot.inflight() = None;
        let removed = slot.set(None).is_some();
        if removed {
            self.inner.stats.record_evictions(1);
        }
        removed
    }

    /// Load every configured namespace for `language` concurrently.
    pub async fn preload(&self, language: Language) -> PreloadSummary {
        let results = future::join_all(
            self.inner
                .namespaces
                .iter()
                .map(|namespace| async move { (namespace.clone(), self.try_get(language, namespace).await) }),
        )
        .await;

        let mut summary = PreloadSummary {
            language,
            loaded: Vec::new(),
            failed: Vec::new(),
        };
        for (namespace, result) in results {
            match result {
                Ok(_) => summary.loaded.push(namespace),
                Err(e) => summary.failed.push((namespace, e.kind().to_string())),
            }
        }

        info!(
            "Preloaded {}: {} loaded, {} failed",
            language,
            summary.loaded.len(),
            summary.failed.len()
        );
        summary
    }

    /// Evict memory entries older than the hard maximum age as of `now`.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let max_age = self.inner.policy.max_age;
        let mut removed = 0;
        for (_, slot) in self.all_slots() {
            let expired = slot
                .current()
                .map(|entry| entry.age(now) > max_age)
                .unwrap_or(false);
            if expired && self.evict(&slot) {
                removed += 1;
            }
        }
        removed
    }

    /// Evict expired entries from memory and from the persistent tier.
    pub async fn sweep(&self) -> SweepSummary {
        let memory = self.sweep_at(Utc::now());
        let persistent = match &self.inner.persistent {
            Some(store) => match store.sweep(self.inner.policy.max_age).await {
                Ok(count) => count,
                Err(e) => {
                    warn!("Persistent cache sweep failed: {:#}", e);
                    0
                }
            },
            None => 0,
        };

        if memory + persistent > 0 {
            info!(
                "Cache sweep evicted {} memory and {} persistent entries",
                memory, persistent
            );
        }
        SweepSummary { memory, persistent }
    }

    /// Number of keys currently holding an entry.
    pub fn len(&self) -> usize {
        self.all_slots()
            .iter()
            .filter(|(_, slot)| slot.current().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<CacheEntryInfo> {
        let now = Utc::now();
        let mut infos: Vec<CacheEntryInfo> = self
            .all_slots()
            .into_iter()
            .filter_map(|((language, namespace), slot)| {
                slot.current().map(|entry| CacheEntryInfo {
                    language,
                    namespace,
                    version: entry.bundle.version.clone(),
                    age_secs: entry.age(now).as_secs(),
                    hits: entry.hits(),
                    stale: entry.is_stale(now),
                })
            })
            .collect();
        infos.sort_by(|a, b| {
            (a.language, &a.namespace).cmp(&(b.language, &b.namespace))
        });
        infos
    }

    pub fn stats(&self) -> CacheStatsReport {
        self.inner.stats.report()
    }
}

impl CacheInner {
    async fn fetch(
        &self,
        language: Language,
        namespace: &Namespace,
        mode: LoadMode,
    ) -> Result<(Arc<TranslationBundle>, DateTime<Utc>), LoadError> {
        if mode == LoadMode::Miss {
            if let Some(store) = &self.persistent {
                if let Some(persisted) = store.get(language, namespace).await {
                    if persisted.age(Utc::now()) <= self.policy.max_age {
                        debug!(
                            "Serving {}/{} from persistent cache (stored {})",
                            language, namespace, persisted.stored_at
                        );
                        return Ok((Arc::new(persisted.bundle), persisted.stored_at));
                    }
                }
            }
        }

        self.stats.record_load();
        let source_id = self.loader.source_id(language, namespace);
        let started = Instant::now();

        let result = match tokio::time::timeout(
            self.policy.load_timeout,
            self.loader.load(language, namespace),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LoadError::Timeout {
                source_id: source_id.clone(),
                timeout_ms: self.policy.load_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(bundle) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                debug!(
                    "Loaded {}/{} from {} in {:.1}ms ({} keys)",
                    language,
                    namespace,
                    source_id,
                    latency_ms,
                    bundle.key_count()
                );
                self.analytics.record(AnalyticsEvent::load_success(
                    language.code(),
                    namespace.as_str(),
                    latency_ms,
                ));

                if let Some(store) = &self.persistent {
                    if let Err(e) = store.put(&bundle).await {
                        warn!("Failed to persist {}/{}: {:#}", language, namespace, e);
                    }
                }
                Ok((Arc::new(bundle), Utc::now()))
            }
            Err(e) => {
                self.stats.record_load_failure();
                warn!(
                    language = %language,
                    namespace = %namespace,
                    source = %e.source_id(),
                    kind = e.kind(),
                    "Bundle load failed: {}",
                    e
                );
                self.analytics.record(AnalyticsEvent::load_error(
                    language.code(),
                    namespace.as_str(),
                    e.kind(),
                ));
                Err(e)
            }
        }
    }
}
