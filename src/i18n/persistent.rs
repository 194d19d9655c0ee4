//! Optional second cache tier that survives process restarts.
//!
//! Entries are stored in an envelope carrying the time they were written and a
//! format version, mirroring the `Cache-Timestamp`/`Cache-Version` header pair
//! browsers use for the same purpose.

use crate::i18n::bundle::{Namespace, TranslationBundle};
use crate::i18n::Language;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Envelope format version. Entries with another version are ignored.
pub const CACHE_VERSION: &str = "1.0";

/// A bundle read back from the persistent tier.
#[derive(Debug, Clone)]
pub struct PersistedBundle {
    pub bundle: TranslationBundle,
    pub stored_at: DateTime<Utc>,
    pub cache_version: String,
}

impl PersistedBundle {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Pluggable persistent tier consulted by the resolution cache before the loader.
///
/// Failures are never fatal: implementations log and report absence.
#[async_trait]
pub trait PersistentCache: Send + Sync {
    async fn get(&self, language: Language, namespace: &Namespace) -> Option<PersistedBundle>;

    async fn put(&self, bundle: &TranslationBundle) -> Result<()>;

    /// Remove entries older than `max_age`. Returns how many were removed.
    async fn sweep(&self, max_age: Duration) -> Result<usize>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "cacheTimestamp")]
    cache_timestamp: i64,
    #[serde(rename = "cacheVersion")]
    cache_version: String,
    bundle: Value,
}

/// Stores envelopes as `{dir}/{lang}/{ns}.json`.
#[derive(Debug, Clone)]
pub struct FsPersistentCache {
    dir: PathBuf,
}

impl FsPersistentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, language: Language, namespace: &Namespace) -> PathBuf {
        self.dir
            .join(language.code())
            .join(format!("{}.json", namespace))
    }

    async fn write_envelope(&self, bundle: &TranslationBundle, stored_at: DateTime<Utc>) -> Result<()> {
        let path = self.path_for(bundle.language, &bundle.namespace);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let envelope = Envelope {
            cache_timestamp: stored_at.timestamp_millis(),
            cache_version: CACHE_VERSION.to_string(),
            bundle: bundle.to_document(),
        };
        let raw = serde_json::to_vec(&envelope).context("Failed to serialize cache envelope")?;

        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl PersistentCache for FsPersistentCache {
    async fn get(&self, language: Language, namespace: &Namespace) -> Option<PersistedBundle> {
        let path = self.path_for(language, namespace);
        let raw = tokio::fs::read(&path).await.ok()?;
        let source_id = path.display().to_string();

        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", source_id, e);
                return None;
            }
        };
        if envelope.cache_version != CACHE_VERSION {
            debug!(
                "Ignoring cache entry {} with version {}",
                source_id, envelope.cache_version
            );
            return None;
        }
        let stored_at = Utc.timestamp_millis_opt(envelope.cache_timestamp).single()?;

        let raw_bundle = serde_json::to_vec(&envelope.bundle).ok()?;
        match TranslationBundle::parse(&source_id, language, namespace, &raw_bundle) {
            Ok(bundle) => Some(PersistedBundle {
                bundle,
                stored_at,
                cache_version: envelope.cache_version,
            }),
            Err(e) => {
                warn!("Ignoring invalid cache entry: {}", e);
                None
            }
        }
    }

    async fn put(&self, bundle: &TranslationBundle) -> Result<()> {
        self.write_envelope(bundle, Utc::now()).await
    }

    async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        let mut languages = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", self.dir.display()))
            }
        };

        while let Some(lang_dir) = languages.next_entry().await? {
            if !lang_dir.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(lang_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                // In-flight `.json.tmp` writes belong to a concurrent `put`
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                let stale = match tokio::fs::read(&path).await {
                    Ok(raw) => match serde_json::from_slice::<Envelope>(&raw) {
                        Ok(envelope) => {
                            match now.timestamp_millis().checked_sub(envelope.cache_timestamp) {
                                Some(age_ms) => {
                                    age_ms < 0
                                        || age_ms as u128 > max_age.as_millis()
                                        || envelope.cache_version != CACHE_VERSION
                                }
                                None => true,
                            }
                        }
                        Err(_) => true,
                    },
                    Err(_) => false,
                };
                if stale {
                    tokio::fs::remove_file(&path)
                        .await
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!("Persistent cache sweep removed {} entries", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::bundle::Entry;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn bundle(language: Language, namespace: &str, key: &str, value: &str) -> TranslationBundle {
        let mut entries = BTreeMap::new();
        entries.insert(key.to_string(), Entry::Text(value.to_string()));
        TranslationBundle::new(language, Namespace::new(namespace).unwrap(), entries)
    }

    // ==================== Round Trip Tests ====================

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path());
        let original = bundle(Language::FRENCH, "common", "hello", "Bonjour");

        cache.put(&original).await.unwrap();
        let persisted = cache
            .get(Language::FRENCH, &original.namespace)
            .await
            .expect("entry should be readable");

        assert_eq!(persisted.bundle, original);
        assert_eq!(persisted.cache_version, CACHE_VERSION);
        assert!(persisted.age(Utc::now()) < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_envelope_format_on_disk() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path());
        cache
            .put(&bundle(Language::ENGLISH, "misc", "a", "b"))
            .await
            .unwrap();

        let raw = std::fs::read(dir.path().join("en").join("misc.json")).unwrap();
        let value: Value = serde_json::from_slice(&raw).unwrap();
        assert!(value["cacheTimestamp"].is_i64());
        assert_eq!(value["cacheVersion"], "1.0");
        assert_eq!(value["bundle"]["translations"]["a"], "b");
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path());
        let ns = Namespace::new("pages").unwrap();
        assert!(cache.get(Language::ENGLISH, &ns).await.is_none());
    }

    #[tokio::test]
    async fn test_get_ignores_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("en")).unwrap();
        std::fs::write(dir.path().join("en").join("pages.json"), "garbage").unwrap();

        let cache = FsPersistentCache::new(dir.path());
        let ns = Namespace::new("pages").unwrap();
        assert!(cache.get(Language::ENGLISH, &ns).await.is_none());
    }

    // ==================== Sweep Tests ====================

    #[tokio::test]
    async fn test_sweep_removes_only_old_entries() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path());

        let old = bundle(Language::SPANISH, "forms", "k", "v");
        cache
            .write_envelope(&old, Utc::now() - chrono::Duration::hours(30))
            .await
            .unwrap();
        let fresh = bundle(Language::SPANISH, "pages", "k", "v");
        cache.put(&fresh).await.unwrap();

        let removed = cache.sweep(Duration::from_secs(24 * 3600)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(cache.get(Language::SPANISH, &old.namespace).await.is_none());
        assert!(cache.get(Language::SPANISH, &fresh.namespace).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_skips_in_flight_temp_files() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path());
        let lang_dir = dir.path().join("fr");
        std::fs::create_dir_all(&lang_dir).unwrap();
        let tmp = lang_dir.join("common.json.tmp");
        std::fs::write(&tmp, b"{\"cacheTim").unwrap();

        let removed = cache.sweep(Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 0);
        assert!(tmp.exists());
    }

    #[tokio::test]
    async fn test_sweep_removes_envelope_with_extreme_timestamp() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path());
        let lang_dir = dir.path().join("fr");
        std::fs::create_dir_all(&lang_dir).unwrap();
        let envelope = serde_json::json!({
            "cacheTimestamp": i64::MIN,
            "cacheVersion": CACHE_VERSION,
            "bundle": {"k": "v"}
        });
        std::fs::write(lang_dir.join("common.json"), envelope.to_string()).unwrap();

        let removed = cache.sweep(Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!lang_dir.join("common.json").exists());
    }

    #[tokio::test]
    async fn test_sweep_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let cache = FsPersistentCache::new(dir.path().join("does-not-exist"));
        assert_eq!(cache.sweep(Duration::from_secs(1)).await.unwrap(), 0);
    }
}
