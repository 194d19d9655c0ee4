//! Bundle loaders: fetch the raw bytes for a (language, namespace) pair and
//! turn them into a validated [`TranslationBundle`].

use crate::error::LoadError;
use crate::i18n::bundle::{Namespace, TranslationBundle};
use crate::i18n::Language;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Source of translation bundles.
///
/// Implementations must be side-effect free apart from the read itself.
#[async_trait]
pub trait BundleLoader: Send + Sync {
    /// Deterministic identifier of the resource backing (language, namespace).
    fn source_id(&self, language: Language, namespace: &Namespace) -> String;

    /// Load and validate one bundle.
    async fn load(
        &self,
        language: Language,
        namespace: &Namespace,
    ) -> Result<TranslationBundle, LoadError>;
}

/// Reads `{root}/{lang}/{ns}.json` from the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBundleLoader {
    root: PathBuf,
}

impl FsBundleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, language: Language, namespace: &Namespace) -> PathBuf {
        self.root
            .join(language.code())
            .join(format!("{}.json", namespace))
    }
}

#[async_trait]
impl BundleLoader for FsBundleLoader {
    fn source_id(&self, language: Language, namespace: &Namespace) -> String {
        self.path_for(language, namespace).display().to_string()
    }

    async fn load(
        &self,
        language: Language,
        namespace: &Namespace,
    ) -> Result<TranslationBundle, LoadError> {
        let path = self.path_for(language, namespace);
        let source_id = path.display().to_string();

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No bundle file at {}", source_id);
                return Err(LoadError::NotFound { source_id });
            }
            Err(e) => {
                return Err(LoadError::Unavailable {
                    source_id,
                    reason: e.to_string(),
                })
            }
        };

        TranslationBundle::parse(&source_id, language, namespace, &raw)
    }
}

/// Fetches `{base}/locales/{lang}/{ns}.json` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBundleLoader {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

/// Outcome of a single HTTP attempt, split by whether another attempt may help.
#[derive(Debug)]
enum FetchFailure {
    Retryable(String),
    Fatal(LoadError),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Retryable(reason) => f.write_str(reason),
            FetchFailure::Fatal(err) => write!(f, "{}", err),
        }
    }
}

impl HttpBundleLoader {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::bundle_fetch(),
        }
    }

    /// Override the retry policy (tests use short delays).
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url_for(&self, language: Language, namespace: &Namespace) -> String {
        format!(
            "{}/locales/{}/{}.json",
            self.base_url,
            language.code(),
            namespace
        )
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchFailure> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchFailure::Retryable(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchFailure::Fatal(LoadError::NotFound {
                source_id: url.to_string(),
            }));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchFailure::Retryable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(FetchFailure::Fatal(LoadError::Unavailable {
                source_id: url.to_string(),
                reason: format!("HTTP {}", status),
            }));
        }

        response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|e| FetchFailure::Retryable(format!("failed to read body: {}", e)))
    }
}

#[async_trait]
impl BundleLoader for HttpBundleLoader {
    fn source_id(&self, language: Language, namespace: &Namespace) -> String {
        self.url_for(language, namespace)
    }

    async fn load(
        &self,
        language: Language,
        namespace: &Namespace,
    ) -> Result<TranslationBundle, LoadError> {
        let url = self.url_for(language, namespace);
        let operation_name = format!("Fetch bundle {}/{}", language, namespace);

        let raw = with_retry_if(
            &self.retry,
            &operation_name,
            || self.fetch_once(&url),
            |failure| matches!(failure, FetchFailure::Retryable(_)),
        )
        .await
        .map_err(|failure| match failure {
            FetchFailure::Fatal(err) => err,
            FetchFailure::Retryable(reason) => {
                warn!("Giving up on {}: {}", url, reason);
                LoadError::Unavailable {
                    source_id: url.clone(),
                    reason,
                }
            }
        })?;

        TranslationBundle::parse(&url, language, namespace, &raw)
    }
}
