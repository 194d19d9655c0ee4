//! Analytics events. Append-only: never mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric name used for bundle load latencies.
pub const LOAD_TIME_METRIC: &str = "load_time";

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Initial language chosen for a session
    Selection,
    /// Explicit switch from one language to another
    Switch,
    PageView,
    LoadSuccess,
    LoadError,
    /// Outcome of a single key resolution
    Resolution,
    /// Arbitrary named numeric sample
    Metric,
    /// Rejected language input
    ValidationError,
}

/// How a key resolution was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Found in the requested language
    Hit,
    /// Found only in the fallback language
    FallbackHit,
    /// Not found anywhere; default or key returned
    Miss,
}

impl ResolutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionOutcome::Hit => "hit",
            ResolutionOutcome::FallbackHit => "fallback_hit",
            ResolutionOutcome::Miss => "miss",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub kind: EventKind,

    /// Language code; for validation errors, the rejected input
    pub language: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ResolutionOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,

    /// Sample value; milliseconds for `load_time`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// Free-form detail: selection source, error kind, validation reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(kind: EventKind, language: impl Into<String>) -> Self {
        Self {
            kind,
            language: language.into(),
            previous_language: None,
            namespace: None,
            key: None,
            outcome: None,
            metric: None,
            value: None,
            detail: None,
            page: None,
            session_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn selection(language: &str, source: &str) -> Self {
        Self::new(EventKind::Selection, language).with_detail(source)
    }

    pub fn switch(from: &str, to: &str) -> Self {
        let mut event = Self::new(EventKind::Switch, to);
        event.previous_language = Some(from.to_string());
        event
    }

    pub fn page_view(language: &str, page: &str) -> Self {
        let mut event = Self::new(EventKind::PageView, language);
        event.page = Some(page.to_string());
        event
    }

    pub fn load_success(language: &str, namespace: &str, latency_ms: f64) -> Self {
        let mut event = Self::new(EventKind::LoadSuccess, language);
        event.namespace = Some(namespace.to_string());
        event.metric = Some(LOAD_TIME_METRIC.to_string());
        event.value = Some(latency_ms);
        event
    }

    pub fn load_error(language: &str, namespace: &str, error_kind: &str) -> Self {
        let mut event = Self::new(EventKind::LoadError, language).with_detail(error_kind);
        event.namespace = Some(namespace.to_string());
        event
    }

    pub fn resolution(
        language: &str,
        namespace: &str,
        key: &str,
        outcome: ResolutionOutcome,
    ) -> Self {
        let mut event = Self::new(EventKind::Resolution, language);
        event.namespace = Some(namespace.to_string());
        event.key = Some(key.to_string());
        event.outcome = Some(outcome);
        event
    }

    pub fn metric(language: &str, name: &str, value: f64) -> Self {
        let mut event = Self::new(EventKind::Metric, language);
        event.metric = Some(name.to_string());
        event.value = Some(value);
        event
    }

    pub fn validation_error(input: &str, reason: &str) -> Self {
        Self::new(EventKind::ValidationError, input).with_detail(reason)
    }

    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
