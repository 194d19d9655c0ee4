//! Usage aggregation: who picked which language, and how they moved between them.

use crate::analytics::event::{AnalyticsEvent, EventKind, ResolutionOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const TOP_LANGUAGES: usize = 5;
const RECENT_SWITCHES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageShare {
    pub language: String,
    pub selections: usize,
    /// Share of all selections, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchRecord {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub total_events: usize,
    pub unique_sessions: usize,

    /// Explicit selections per language: initial selections plus switch targets
    pub selections: BTreeMap<String, usize>,

    /// Percentage share of `selections`
    pub selection_share: BTreeMap<String, f64>,

    /// from -> to -> count
    pub switch_patterns: BTreeMap<String, BTreeMap<String, usize>>,

    /// language -> page -> views
    pub page_views: BTreeMap<String, BTreeMap<String, usize>>,

    /// Failed loads over all loads, 0-1, per language
    pub error_rates: BTreeMap<String, f64>,

    /// Resolutions that fell through to a default or the key itself
    pub missing_keys: BTreeMap<String, usize>,

    /// Rejected language inputs
    pub validation_errors: usize,

    pub top_languages: Vec<LanguageShare>,

    /// Newest first
    pub recent_switches: Vec<SwitchRecord>,
}

impl UsageMetrics {
    /// Aggregate a slice of events. Order of `events` does not matter.
    pub fn compute(events: &[AnalyticsEvent]) -> UsageMetrics {
        let mut metrics = UsageMetrics {
            total_events: events.len(),
            ..Default::default()
        };

        let mut sessions = BTreeSet::new();
        let mut loads: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut switches = Vec::new();

        for event in events {
            if let Some(session) = &event.session_id {
                sessions.insert(session.as_str());
            }

            match event.kind {
                EventKind::Selection => {
                    *metrics.selections.entry(event.language.clone()).or_default() += 1;
                }
                EventKind::Switch => {
                    *metrics.selections.entry(event.language.clone()).or_default() += 1;
                    if let Some(from) = &event.previous_language {
                        *metrics
                            .switch_patterns
                            .entry(from.clone())
                            .or_default()
                            .entry(event.language.clone())
                            .or_default() += 1;
                        switches.push(SwitchRecord {
                            from: from.clone(),
                            to: event.language.clone(),
                            timestamp: event.timestamp,
                        });
                    }
                }
                EventKind::PageView => {
                    let page = event.page.clone().unwrap_or_else(|| "/".to_string());
                    *metrics
                        .page_views
                        .entry(event.language.clone())
                        .or_default()
                        .entry(page)
                        .or_default() += 1;
                }
                EventKind::LoadSuccess => {
                    loads.entry(event.language.clone()).or_default().0 += 1;
                }
                EventKind::LoadError => {
                    loads.entry(event.language.clone()).or_default().1 += 1;
                }
                EventKind::Resolution => {
                    if event.outcome == Some(ResolutionOutcome::Miss) {
                        *metrics.missing_keys.entry(event.language.clone()).or_default() += 1;
                    }
                }
                EventKind::ValidationError => metrics.validation_errors += 1,
                EventKind::Metric => {}
            }
        }

        metrics.unique_sessions = sessions.len();

        for (language, (ok, failed)) in loads {
            let total = ok + failed;
            if total > 0 {
                metrics
                    .error_rates
                    .insert(language, failed as f64 / total as f64);
            }
        }

        let total_selections: usize = metrics.selections.values().sum();
        if total_selections > 0 {
            for (language, count) in &metrics.selections {
                metrics.selection_share.insert(
                    language.clone(),
                    *count as f64 / total_selections as f64 * 100.0,
                );
            }
        }

        let mut ranked: Vec<LanguageShare> = metrics
            .selections
            .iter()
            .map(|(language, count)| LanguageShare {
                language: language.clone(),
                selections: *count,
                percentage: metrics.selection_share.get(language).copied().unwrap_or(0.0),
            })
            .collect();
        // Stable sort keeps ties in code order
        ranked.sort_by(|a, b| b.selections.cmp(&a.selections));
        ranked.truncate(TOP_LANGUAGES);
        metrics.top_languages = ranked;

        switches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        switches.truncate(RECENT_SWITCHES);
        metrics.recent_switches = switches;

        metrics
    }
}
