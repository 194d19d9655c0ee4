//! Performance aggregation per (language, metric).

use crate::analytics::event::AnalyticsEvent;
use serde::Serialize;
use std::collections::BTreeMap;

/// Relative change between window halves that counts as a real movement.
const TREND_THRESHOLD: f64 = 0.10;

/// Fewer samples than this are always `Stable`.
const MIN_TREND_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Degrading,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Degrading => "degrading",
            Trend::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub language: String,
    pub metric: String,
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub trend: Trend,
}

impl MetricStats {
    /// Summarise samples given in the order they were recorded.
    ///
    /// Returns `None` for an empty sample.
    pub fn from_samples(language: &str, metric: &str, samples: &[f64]) -> Option<MetricStats> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let avg = sorted.iter().sum::<f64>() / count as f64;
        let p95_index = ((count as f64 * 0.95).floor() as usize).min(count - 1);

        Some(MetricStats {
            language: language.to_string(),
            metric: metric.to_string(),
            count,
            avg,
            min: sorted[0],
            max: sorted[count - 1],
            p95: sorted[p95_index],
            trend: classify_trend(samples),
        })
    }
}

/// Compare the mean of the first half of `samples` against the second half.
///
/// `samples` must be in chronological order. The first half holds
/// `floor(n / 2)` values, so an odd middle sample counts toward the later half.
pub fn classify_trend(samples: &[f64]) -> Trend {
    if samples.len() < MIN_TREND_SAMPLES {
        return Trend::Stable;
    }

    let mid = samples.len() / 2;
    let (first, second) = samples.split_at(mid);
    let first_avg = first.iter().sum::<f64>() / first.len() as f64;
    let second_avg = second.iter().sum::<f64>() / second.len() as f64;

    if first_avg == 0.0 {
        return Trend::Stable;
    }

    let change = (second_avg - first_avg) / first_avg;
    if change > TREND_THRESHOLD {
        Trend::Degrading
    } else if change < -TREND_THRESHOLD {
        Trend::Improving
    } else {
        Trend::Stable
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Sorted by language then metric
    pub entries: Vec<MetricStats>,
}

impl PerformanceMetrics {
    /// Group every event carrying a metric sample by (language, metric).
    pub fn compute(events: &[AnalyticsEvent]) -> PerformanceMetrics {
        let mut chronological: Vec<&AnalyticsEvent> = events.iter().collect();
        chronological.sort_by_key(|event| event.timestamp);

        let mut grouped: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
        for event in chronological {
            if let (Some(metric), Some(value)) = (&event.metric, event.value) {
                if value.is_finite() {
                    grouped
                        .entry((event.language.clone(), metric.clone()))
                        .or_default()
                        .push(value);
                }
            }
        }

        let entries = grouped
            .into_iter()
            .filter_map(|((language, metric), samples)| {
                MetricStats::from_samples(&language, &metric, &samples)
            })
            .collect();

        PerformanceMetrics { entries }
    }

    pub fn get(&self, language: &str, metric: &str) -> Option<&MetricStats> {
        self.entries
            .iter()
            .find(|stats| stats.language == language && stats.metric == metric)
    }
}
