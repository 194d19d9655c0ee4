//! Resolution cache counters.
//!
//! Each cache owns its own counters so independent caches (and tests) never
//! observe each other's traffic.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Atomic counters updated on the cache's hot path.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from memory (fresh or stale)
    hits: AtomicUsize,

    /// Lookups that found nothing in memory
    misses: AtomicUsize,

    /// Hits that returned an entry older than its TTL
    stale_served: AtomicUsize,

    /// Background refreshes started for stale entries
    refreshes: AtomicUsize,

    /// Loader calls actually issued (after coalescing)
    loads: AtomicUsize,

    /// Loader calls that failed or timed out
    load_failures: AtomicUsize,

    /// Entries removed by sweep or invalidation
    evictions: AtomicUsize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    pub fn report(&self) -> CacheStatsReport {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups > 0 {
            (hits as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        CacheStatsReport {
            hits,
            misses,
            hit_rate,
            stale_served: self.stale_served.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            loads: self.loads(),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatsReport {
    pub hits: usize,
    pub misses: usize,

    /// Hit rate as a percentage (0-100)
    pub hit_rate: f64,

    pub stale_served: usize,
    pub refreshes: usize,
    pub loads: usize,
    pub load_failures: usize,
    pub evictions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Counter Tests ====================

    #[test]
    fn test_counters_start_at_zero() {
        let report = CacheStats::new().report();
        assert_eq!(report.hits, 0);
        assert_eq!(report.loads, 0);
        assert_eq!(report.hit_rate, 0.0);
    }

    #[test]
    fn test_record_each_counter() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_stale_served();
        stats.record_refresh();
        stats.record_load();
        stats.record_load_failure();
        stats.record_evictions(3);

        let report = stats.report();
        assert_eq!(report.hits, 1);
        assert_eq!(report.misses, 1);
        assert_eq!(report.stale_served, 1);
        assert_eq!(report.refreshes, 1);
        assert_eq!(report.loads, 1);
        assert_eq!(report.load_failures, 1);
        assert_eq!(report.evictions, 3);
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_report_hit_rate() {
        let stats = CacheStats::new();

        // 3 hits, 1 miss = 75% hit rate
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert_eq!(stats.report().hit_rate, 75.0);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = CacheStats::new();
        let b = CacheStats::new();
        a.record_hit();
        assert_eq!(b.report().hits, 0);
    }
}
