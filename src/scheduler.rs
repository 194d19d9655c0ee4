use crate::analytics::{Alert, Severity, TimeWindow, WebhookNotifier};
use crate::config::Config;
use crate::i18n::ResolutionCache;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

/// Span of events considered by each alert evaluation.
const ALERT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Initialize and start the scheduler
pub async fn start_scheduler(
    config: Arc<Config>,
    cache: ResolutionCache,
    notifier: Option<WebhookNotifier>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_every = Duration::from_secs(config.sweep_interval_secs);
    info!("Scheduling cache sweep every {:?}", sweep_every);
    let sweep_cache = cache.clone();
    let sweep_job = Job::new_repeated_async(sweep_every, move |_uuid, _l| {
        let cache = sweep_cache.clone();
        Box::pin(async move {
            run_sweep_job(&cache).await;
        })
    })?;
    scheduler.add(sweep_job).await?;

    let alert_every = Duration::from_secs(config.alert_interval_secs);
    info!("Scheduling alert evaluation every {:?}", alert_every);
    let notifier = notifier.map(Arc::new);
    let alert_job = Job::new_repeated_async(alert_every, move |_uuid, _l| {
        let cache = cache.clone();
        let notifier = notifier.clone();
        Box::pin(async move {
            if let Err(e) = run_alert_job(&cache, notifier.as_deref()).await {
                error!("Alert job failed: {:#}", e);
            }
        })
    })?;
    scheduler.add(alert_job).await?;

    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Evict expired bundles from every cache tier.
pub async fn run_sweep_job(cache: &ResolutionCache) {
    let summary = cache.sweep().await;
    debug!(
        "Sweep finished: {} memory, {} persistent evicted",
        summary.memory, summary.persistent
    );
}

/// Evaluate alerts over the trailing hour and deliver them.
///
/// Without a webhook the alerts are logged instead. Returns the alerts found.
pub async fn run_alert_job(
    cache: &ResolutionCache,
    notifier: Option<&WebhookNotifier>,
) -> Result<Vec<Alert>> {
    let alerts = cache.analytics().alerts(&TimeWindow::trailing(ALERT_WINDOW));
    if alerts.is_empty() {
        debug!("No analytics alerts in the last hour");
        return Ok(alerts);
    }

    match notifier {
        Some(notifier) => notifier.notify(&alerts).await?,
        None => {
            for alert in &alerts {
                if alert.severity == Severity::High {
                    error!("[{}] {}", alert.kind.as_str(), alert.message);
                } else {
                    warn!("[{}] {}", alert.kind.as_str(), alert.message);
                }
            }
        }
    }

    Ok(alerts)
}
