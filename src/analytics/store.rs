//! Bounded, append-only event log.

use crate::analytics::alerts::{evaluate_alerts, Alert};
use crate::analytics::event::{AnalyticsEvent, EventKind};
use crate::analytics::performance::PerformanceMetrics;
use crate::analytics::report::AnalyticsReport;
use crate::analytics::usage::UsageMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Default number of retained events.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Inclusive time range that aggregations run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The window ending now and spanning `span`.
    pub fn trailing(span: Duration) -> Self {
        let to = Utc::now();
        let span = chrono::Duration::from_std(span)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let from = to.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { from, to }
    }

    /// Everything ever recorded.
    pub fn all() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.from && timestamp <= self.to
    }
}

/// Shared handle to the event log. Cloning shares the same log.
///
/// Recording takes a short lock and never awaits, so callers on the
/// resolution path are never blocked on I/O.
#[derive(Debug, Clone)]
pub struct AnalyticsStore {
    events: Arc<Mutex<VecDeque<AnalyticsEvent>>>,
    capacity: usize,
}

impl Default for AnalyticsStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AnalyticsStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AnalyticsEvent>> {
        // A panic while holding the lock cannot leave a half-written event
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an event, dropping the oldest one when full.
    pub fn record(&self, event: AnalyticsEvent) {
        debug!(kind = ?event.kind, language = %event.language, "analytics event");
        let mut events = self.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copy of the events inside `window`, oldest first.
    pub fn events(&self, window: &TimeWindow) -> Vec<AnalyticsEvent> {
        self.lock()
            .iter()
            .filter(|event| window.contains(event.timestamp))
            .cloned()
            .collect()
    }

    /// Events of one kind inside `window`.
    pub fn events_of(&self, kind: EventKind, window: &TimeWindow) -> Vec<AnalyticsEvent> {
        self.lock()
            .iter()
            .filter(|event| event.kind == kind && window.contains(event.timestamp))
            .cloned()
            .collect()
    }

    pub fn usage(&self, window: &TimeWindow) -> UsageMetrics {
        UsageMetrics::compute(&self.events(window))
    }

    pub fn performance(&self, window: &TimeWindow) -> PerformanceMetrics {
        PerformanceMetrics::compute(&self.events(window))
    }

    pub fn alerts(&self, window: &TimeWindow) -> Vec<Alert> {
        let events = self.events(window);
        let usage = UsageMetrics::compute(&events);
        let performance = PerformanceMetrics::compute(&events);
        evaluate_alerts(&usage, &performance)
    }

    /// Usage, performance and alerts over `window` in one document.
    pub fn report(&self, window: &TimeWindow) -> AnalyticsReport {
        AnalyticsReport::build(*window, &self.events(window))
    }

    /// JSON blob for external dashboards.
    pub fn export_report(&self, window: &TimeWindow) -> serde_json::Value {
        self.report(window).to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Recording Tests ====================

    #[test]
    fn test_record_and_clear() {
        let store = AnalyticsStore::new(10);
        store.record(AnalyticsEvent::selection("en", "default"));
        store.record(AnalyticsEvent::switch("en", "fr"));
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let store = AnalyticsStore::new(2);
        store.record(AnalyticsEvent::page_view("en", "/a"));
        store.record(AnalyticsEvent::page_view("en", "/b"));
        store.record(AnalyticsEvent::page_view("en", "/c"));

        let pages: Vec<_> = store
            .events(&TimeWindow::all())
            .into_iter()
            .filter_map(|e| e.page)
            .collect();
        assert_eq!(pages, vec!["/b", "/c"]);
    }

    #[test]
    fn test_clones_share_the_log() {
        let store = AnalyticsStore::default();
        let handle = store.clone();
        handle.record(AnalyticsEvent::selection("ar", "browser"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.capacity(), DEFAULT_CAPACITY);
    }

    // ==================== Window Tests ====================

    #[test]
    fn test_window_filters_events() {
        let store = AnalyticsStore::new(10);
        let now = Utc::now();
        store.record(AnalyticsEvent::selection("en", "default").at(now - chrono::Duration::hours(3)));
        store.record(AnalyticsEvent::selection("fr", "browser").at(now));

        let recent = store.events(&TimeWindow::trailing(Duration::from_secs(3600)));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].language, "fr");
        assert_eq!(store.events(&TimeWindow::all()).len(), 2);
    }

    #[test]
    fn test_events_of_kind() {
        let store = AnalyticsStore::new(10);
        store.record(AnalyticsEvent::selection("en", "default"));
        store.record(AnalyticsEvent::validation_error("xx", "unsupported"));

        let rejected = store.events_of(EventKind::ValidationError, &TimeWindow::all());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].language, "xx");
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc::now();
        let window = TimeWindow::new(now, now);
        assert!(window.contains(now));
        assert!(!window.contains(now + chrono::Duration::milliseconds(1)));
    }
}
