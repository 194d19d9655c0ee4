use anyhow::{Context, Result};
use baobab_i18n::analytics::{AnalyticsStore, WebhookNotifier};
use baobab_i18n::config::Config;
use baobab_i18n::i18n::{
    BundleLoader, FsBundleLoader, FsPersistentCache, HttpBundleLoader, ResolutionCache, Translator,
};
use baobab_i18n::{scheduler, server};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("baobab_i18n=info".parse()?),
        )
        .init();

    info!("Starting Baobab i18n service");

    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);
    let client = reqwest::Client::new();

    let loader: Arc<dyn BundleLoader> = match &config.bundle_base_url {
        Some(base_url) => {
            info!("Loading bundles over HTTP from {}", base_url);
            Arc::new(HttpBundleLoader::new(client.clone(), base_url))
        }
        None => {
            info!("Loading bundles from {}", config.bundle_dir);
            Arc::new(FsBundleLoader::new(&config.bundle_dir))
        }
    };

    let mut builder = ResolutionCache::builder(loader)
        .policy(config.cache_policy())
        .namespaces(config.namespaces.clone())
        .analytics(AnalyticsStore::new(config.analytics_capacity));
    if let Some(dir) = &config.persistent_cache_dir {
        info!("Persistent bundle cache enabled at {}", dir);
        builder = builder.persistent(Arc::new(FsPersistentCache::new(dir)));
    }
    let cache = builder.build();

    // Warm the fallback language so misses never wait on it
    let warm = cache.preload(config.fallback_language).await;
    info!(
        "Warmed {}: {}/{} namespaces",
        warm.language,
        warm.loaded.len(),
        config.namespaces.len()
    );

    let notifier = config
        .alert_webhook_url
        .as_deref()
        .map(|url| WebhookNotifier::new(client.clone(), url));
    let _scheduler = scheduler::start_scheduler(Arc::clone(&config), cache.clone(), notifier)
        .await
        .context("Failed to start scheduler")?;

    let translator = Translator::new(cache, config.fallback_language);
    let state = server::AppState::new(Arc::clone(&config), translator);
    let app = server::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✓ Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
