use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Exponential backoff settings for remote calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included. 0 behaves like 1.
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_delay: Duration,
    /// Ceiling for any single wait
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Remote bundle store: waits 1s then 2s.
    pub fn bundle_fetch() -> Self {
        Self::new(3, Duration::from_secs(1)).with_max_delay(Duration::from_secs(4))
    }

    /// Alert webhook: waits 2s, 4s, then 8s.
    pub fn alert_delivery() -> Self {
        Self::new(4, Duration::from_secs(2)).with_max_delay(Duration::from_secs(8))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Waits between consecutive attempts, in order. Yields `attempts() - 1` values.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.attempts().saturating_sub(1)).map(move |retry| {
            let millis =
                self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(retry as i32);
            Duration::from_millis(millis as u64).min(self.max_delay)
        })
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::bundle_fetch()
    }
}

/// Run `operation` until it succeeds or the attempts run out, retrying every error.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, label, operation, |_| true).await
}

/// Like [`with_retry`], but an error for which `is_transient` returns false is
/// returned at once.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let total = config.attempts();
    let mut waits = config.delays();
    let mut attempt = 1;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}/{}", label, attempt, total);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_transient(&err) {
            debug!("{}: permanent failure, not retrying: {}", label, err);
            return Err(err);
        }

        let Some(wait) = waits.next() else {
            warn!("{}: giving up after {} attempts: {}", label, total, err);
            return Err(err);
        };

        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {:?}",
            label, attempt, total, err, wait
        );
        sleep(wait).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn unavailable(n: u32) -> LoadError {
        LoadError::Unavailable {
            source_id: "https://cdn.test/locales/fr/common.json".to_string(),
            reason: format!("HTTP 503 (attempt {})", n),
        }
    }

    fn not_found() -> LoadError {
        LoadError::NotFound {
            source_id: "https://cdn.test/locales/fr/common.json".to_string(),
        }
    }

    // ==================== Schedule Tests ====================

    #[test]
    fn test_default_is_bundle_fetch() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        let delays: Vec<_> = config.delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn test_alert_delivery_schedule() {
        let delays: Vec<_> = RetryConfig::alert_delivery().delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
        );
    }

    #[test]
    fn test_delays_capped_at_max() {
        let config = RetryConfig::new(6, Duration::from_millis(100))
            .with_backoff_multiplier(3.0)
            .with_max_delay(Duration::from_millis(500));
        let delays: Vec<_> = config.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(300),
                Duration::from_millis(500),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_delays() {
        assert_eq!(RetryConfig::new(1, Duration::from_secs(1)).delays().count(), 0);
        assert_eq!(RetryConfig::new(0, Duration::from_secs(1)).delays().count(), 0);
    }

    // ==================== with_retry Tests ====================

    #[tokio::test]
    async fn test_recovers_from_transient_errors() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<&str, LoadError> = with_retry(&config, "fetch fr/common", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(unavailable(n))
                } else {
                    Ok("bundle")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "bundle");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), LoadError> = with_retry(&config, "fetch fr/common", || {
            let calls = calls.clone();
            async move { Err(unavailable(calls.fetch_add(1, Ordering::SeqCst) + 1)) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("attempt 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig::new(0, Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), LoadError> = with_retry(&config, "fetch", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(not_found())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ==================== with_retry_if Tests ====================

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), LoadError> = with_retry_if(
            &config,
            "fetch fr/common",
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(not_found())
                }
            },
            |e| matches!(e, LoadError::Unavailable { .. }),
        )
        .await;

        assert!(matches!(result, Err(LoadError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_then_permanent_stops() {
        let config = RetryConfig::new(5, Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), LoadError> = with_retry_if(
            &config,
            "fetch fr/common",
            || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        Err(unavailable(n))
                    } else {
                        Err(not_found())
                    }
                }
            },
            |e| matches!(e, LoadError::Unavailable { .. }),
        )
        .await;

        assert!(matches!(result, Err(LoadError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backoff_waits_between_attempts() {
        let config = RetryConfig::new(3, Duration::from_millis(40));
        let start = std::time::Instant::now();

        let _: Result<(), LoadError> =
            with_retry(&config, "fetch", || async { Err(unavailable(0)) }).await;

        // 40ms + 80ms
        assert!(start.elapsed() >= Duration::from_millis(120));
    }
}
