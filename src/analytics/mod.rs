//! Usage and performance analytics over an append-only event log.
//!
//! - `event`: the event record and its kinds
//! - `store`: bounded, shareable event log and time windows
//! - `usage` / `performance`: pure aggregations over a window
//! - `alerts`: threshold evaluation
//! - `report`: JSON export for dashboards
//! - `notifier`: webhook delivery, invoked by the scheduler

mod alerts;
mod event;
mod notifier;
mod performance;
mod report;
mod store;
mod usage;

pub use alerts::{evaluate_alerts, Alert, AlertKind, Severity};
pub use event::{AnalyticsEvent, EventKind, ResolutionOutcome, LOAD_TIME_METRIC};
pub use notifier::WebhookNotifier;
pub use performance::{classify_trend, MetricStats, PerformanceMetrics, Trend};
pub use report::AnalyticsReport;
pub use store::{AnalyticsStore, TimeWindow, DEFAULT_CAPACITY};
pub use usage::{LanguageShare, SwitchRecord, UsageMetrics};
