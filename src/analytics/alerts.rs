//! Threshold alerts. Alerts are data; delivering them is the caller's job.

use crate::analytics::event::LOAD_TIME_METRIC;
use crate::analytics::performance::{PerformanceMetrics, Trend};
use crate::analytics::usage::UsageMetrics;
use serde::Serialize;

/// Average load time above which an alert is raised (ms).
pub const SLOW_LOAD_MS: f64 = 3000.0;
/// Average or p95 load time considered severe (ms).
pub const SEVERE_LOAD_MS: f64 = 5000.0;
/// Load error rate above which an alert is raised.
pub const ERROR_RATE_THRESHOLD: f64 = 0.10;
/// Load error rate considered severe.
pub const SEVERE_ERROR_RATE: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SlowLoadTime,
    P95LoadTime,
    PerformanceDegradation,
    ErrorRate,
    InvalidLanguage,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::SlowLoadTime => "slow_load_time",
            AlertKind::P95LoadTime => "p95_load_time",
            AlertKind::PerformanceDegradation => "performance_degradation",
            AlertKind::ErrorRate => "error_rate",
            AlertKind::InvalidLanguage => "invalid_language",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    pub message: String,
    /// The measured value that tripped the threshold
    pub value: f64,
}

/// Evaluate every threshold over already-aggregated metrics.
pub fn evaluate_alerts(usage: &UsageMetrics, performance: &PerformanceMetrics) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for stats in &performance.entries {
        if stats.metric == LOAD_TIME_METRIC {
            if stats.avg > SLOW_LOAD_MS {
                alerts.push(Alert {
                    kind: AlertKind::SlowLoadTime,
                    severity: if stats.avg > SEVERE_LOAD_MS {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    language: Some(stats.language.clone()),
                    metric: Some(stats.metric.clone()),
                    message: format!(
                        "Average load time for {} is {:.0}ms",
                        stats.language, stats.avg
                    ),
                    value: stats.avg,
                });
            }

            if stats.p95 > SEVERE_LOAD_MS {
                alerts.push(Alert {
                    kind: AlertKind::P95LoadTime,
                    severity: Severity::High,
                    language: Some(stats.language.clone()),
                    metric: Some(stats.metric.clone()),
                    message: format!(
                        "95th percentile load time for {} is {:.0}ms",
                        stats.language, stats.p95
                    ),
                    value: stats.p95,
                });
            }
        }

        if stats.trend == Trend::Degrading {
            alerts.push(Alert {
                kind: AlertKind::PerformanceDegradation,
                severity: Severity::Medium,
                language: Some(stats.language.clone()),
                metric: Some(stats.metric.clone()),
                message: format!(
                    "Performance degradation detected for {} {}",
                    stats.language, stats.metric
                ),
                value: stats.avg,
            });
        }
    }

    for (language, rate) in &usage.error_rates {
        if *rate > ERROR_RATE_THRESHOLD {
            alerts.push(Alert {
                kind: AlertKind::ErrorRate,
                severity: if *rate > SEVERE_ERROR_RATE {
                    Severity::High
                } else {
                    Severity::Medium
                },
                language: Some(language.clone()),
                metric: None,
                message: format!(
                    "High error rate for {}: {:.1}%",
                    language,
                    rate * 100.0
                ),
                value: *rate,
            });
        }
    }

    if usage.validation_errors > 0 {
        alerts.push(Alert {
            kind: AlertKind::InvalidLanguage,
            severity: Severity::Low,
            language: None,
            metric: None,
            message: format!(
                "{} invalid language selection(s) rejected",
                usage.validation_errors
            ),
            value: usage.validation_errors as f64,
        });
    }

    alerts
}
