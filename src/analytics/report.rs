use crate::analytics::alerts::{evaluate_alerts, Alert};
use crate::analytics::event::AnalyticsEvent;
use crate::analytics::performance::PerformanceMetrics;
use crate::analytics::store::TimeWindow;
use crate::analytics::usage::UsageMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Exported snapshot consumed by dashboards and monitoring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub window: TimeWindow,
    pub usage: UsageMetrics,
    pub performance: PerformanceMetrics,
    pub alerts: Vec<Alert>,
}

impl AnalyticsReport {
    pub fn build(window: TimeWindow, events: &[AnalyticsEvent]) -> AnalyticsReport {
        let usage = UsageMetrics::compute(events);
        let performance = PerformanceMetrics::compute(events);
        let alerts = evaluate_alerts(&usage, &performance);

        AnalyticsReport {
            generated_at: Utc::now(),
            window,
            usage,
            performance,
            alerts,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a plain map, list or number, so this cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
