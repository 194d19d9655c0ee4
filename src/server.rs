//! HTTP surface over the translation runtime.

use crate::analytics::{AnalyticsEvent, ResolutionOutcome, TimeWindow};
use crate::config::Config;
use crate::i18n::{
    CacheEntryInfo, CacheStatsReport, Language, LanguageRegistry, LocaleContext, LocaleHints,
    LocaleMetadata, Namespace, ResolveOptions, TranslationValidator, Translator, UrlScheme,
    ValidationReport,
};
use crate::security;
use axum::{
    extract::{Path, Query, Request, State},
    http::{header::ACCEPT_LANGUAGE, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Header carrying the admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub translator: Translator,
    pub urls: UrlScheme,
}

impl AppState {
    pub fn new(config: Arc<Config>, translator: Translator) -> Self {
        let urls = UrlScheme::new(&config.public_base_url, config.default_language);
        Self {
            config,
            translator,
            urls,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unprocessable: {0}")]
    Unprocessable(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
        };
        (
            status,
            Json(ErrorBody {
                error: error.to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/analytics/report", get(analytics_report))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache/invalidate", post(invalidate_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .route("/health", get(health))
        .route("/api/translations/:lang/:ns", get(get_bundle))
        .route("/api/translate/:lang/:ns", get(translate))
        .route("/api/translate/:lang/:ns/batch", post(translate_batch))
        .route("/api/locale", get(locale))
        .route("/api/locale/switch", post(switch_locale))
        .route("/api/quality/:lang/:ns", get(quality))
        .merge(admin)
        .with_state(state)
}

pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    if security::authorize(state.config.api_key.as_deref(), presented) {
        Ok(next.run(request).await)
    } else {
        warn!("Admin request rejected: missing or invalid API key");
        Err(ApiError::Unauthorized)
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn parse_namespace(raw: &str) -> Result<Namespace, ApiError> {
    Namespace::new(raw).ok_or_else(|| ApiError::NotFound(format!("namespace '{}'", raw)))
}

/// Unsupported codes resolve in the fallback language instead of failing.
fn language_or_fallback(state: &AppState, code: &str) -> Language {
    match Language::from_code(code) {
        Ok(language) => language,
        Err(_) => {
            state
                .translator
                .cache()
                .analytics()
                .record(AnalyticsEvent::validation_error(code, "unsupported language"));
            state.translator.fallback_language()
        }
    }
}

pub async fn get_bundle(
    State(state): State<AppState>,
    Path((lang, ns)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let language = Language::from_code(&lang)
        .map_err(|_| ApiError::NotFound(format!("language '{}'", lang)))?;
    let namespace = parse_namespace(&ns)?;

    let entry = state
        .translator
        .cache()
        .try_get(language, &namespace)
        .await
        .map_err(|e| ApiError::NotFound(format!("{}/{} ({})", language, namespace, e.kind())))?;

    Ok(Json(entry.bundle.to_document()))
}

#[derive(Debug, Deserialize)]
pub struct TranslateQuery {
    pub key: String,
    pub default: Option<String>,
    pub count: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub language: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub outcome: ResolutionOutcome,
}

pub async fn translate(
    State(state): State<AppState>,
    Path((lang, ns)): Path<(String, String)>,
    Query(query): Query<TranslateQuery>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let language = language_or_fallback(&state, &lang);
    let namespace = parse_namespace(&ns)?;
    let options = ResolveOptions {
        default: query.default,
        count: query.count,
        ..ResolveOptions::default()
    };

    let resolved = state
        .translator
        .resolve_detailed(language, &namespace, &query.key, &options)
        .await;

    Ok(Json(TranslateResponse {
        language: language.code().to_string(),
        namespace: namespace.to_string(),
        key: query.key,
        value: resolved.text,
        outcome: resolved.outcome,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub keys: Vec<String>,
}

pub async fn translate_batch(
    State(state): State<AppState>,
    Path((lang, ns)): Path<(String, String)>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let language = language_or_fallback(&state, &lang);
    let namespace = parse_namespace(&ns)?;

    let results = state
        .translator
        .resolve_batch(
            language,
            &namespace,
            request.keys.iter().map(String::as_str),
            &ResolveOptions::default(),
        )
        .await;

    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct LocaleQuery {
    pub path: Option<String>,
    /// Stored preference, if the client has one
    pub lang: Option<String>,
    pub session: Option<String>,
}

pub async fn locale(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
    headers: HeaderMap,
) -> Json<LocaleMetadata> {
    let hints = LocaleHints {
        persisted: query.lang,
        accept_language: headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        session_id: query.session,
    };

    let (context, _) = LocaleContext::initialize(
        state.translator.cache().clone(),
        state.urls.clone(),
        &hints,
    );
    let path = query.path.unwrap_or_else(|| "/".to_string());
    context.page_view(&path);

    Json(context.metadata(&path))
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub from: Option<String>,
    pub to: String,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub from: Language,
    pub to: Language,
    pub changed: bool,
    pub metadata: LocaleMetadata,
}

pub async fn switch_locale(
    State(state): State<AppState>,
    Json(request): Json<SwitchRequest>,
) -> Result<Json<SwitchResponse>, ApiError> {
    let current = request
        .from
        .as_deref()
        .and_then(|code| Language::from_code(code).ok())
        .unwrap_or(state.config.default_language);

    let mut context = LocaleContext::new(
        current,
        state.translator.cache().clone(),
        state.urls.clone(),
    );
    // The preload keeps running in the background after the response
    let outcome = context
        .switch_language(&request.to)
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    let path = request.path.unwrap_or_else(|| "/".to_string());
    Ok(Json(SwitchResponse {
        from: outcome.from,
        to: outcome.to,
        changed: outcome.changed(),
        metadata: context.metadata(&path),
    }))
}

pub async fn quality(
    State(state): State<AppState>,
    Path((lang, ns)): Path<(String, String)>,
) -> Result<Json<ValidationReport>, ApiError> {
    let language = Language::from_code(&lang)
        .map_err(|_| ApiError::NotFound(format!("language '{}'", lang)))?;
    let namespace = parse_namespace(&ns)?;
    let cache = state.translator.cache();

    let reference = cache
        .try_get(Language::canonical(), &namespace)
        .await
        .map_err(|e| ApiError::NotFound(format!("reference bundle ({})", e.kind())))?;
    let translated = cache
        .try_get(language, &namespace)
        .await
        .map_err(|e| ApiError::NotFound(format!("{}/{} ({})", language, namespace, e.kind())))?;

    Ok(Json(TranslationValidator::validate(
        &reference.bundle,
        &translated.bundle,
    )))
}

/// Longest report window, one year
const MAX_REPORT_HOURS: u64 = 24 * 366;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub hours: Option<u64>,
}

pub async fn analytics_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Json<serde_json::Value> {
    let hours = query.hours.unwrap_or(24).min(MAX_REPORT_HOURS);
    let window = TimeWindow::trailing(Duration::from_secs(hours * 60 * 60));
    Json(state.translator.cache().analytics().export_report(&window))
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub stats: CacheStatsReport,
    pub entries: Vec<CacheEntryInfo>,
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache = state.translator.cache();
    Json(CacheStatsResponse {
        stats: cache.stats(),
        entries: cache.snapshot(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateRequest {
    pub language: Option<String>,
    pub namespace: Option<String>,
}

pub async fn invalidate_cache(
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cache = state.translator.cache();
    let language = request
        .language
        .as_deref()
        .map(|code| Language::from_code(code).map_err(|e| ApiError::Unprocessable(e.to_string())))
        .transpose()?;
    let namespace = request
        .namespace
        .as_deref()
        .map(|name| {
            Namespace::new(name)
                .ok_or_else(|| ApiError::Unprocessable(format!("invalid namespace '{}'", name)))
        })
        .transpose()?;

    let removed = match (language, namespace) {
        (Some(language), Some(namespace)) => usize::from(cache.invalidate(language, &namespace)),
        (Some(language), None) => cache.invalidate_language(language),
        (None, Some(namespace)) => LanguageRegistry::get()
            .enabled_codes()
            .into_iter()
            .filter_map(|code| Language::from_code(code).ok())
            .filter(|language| cache.invalidate(*language, &namespace))
            .count(),
        (None, None) => cache.invalidate_all(),
    };

    info!("Admin invalidation removed {} cached bundle(s)", removed);
    Ok(Json(serde_json::json!({ "removed": removed })))
}
