//! Metrics aggregator for the preview engine.
//!
//! Read-only consumer of engine, cache, and refresher events: cache
//! hit/miss/eviction counters (evictions broken out by reason), build-time
//! percentiles globally and per theme, curated-vs-sampled raw counts, and
//! adaptive-TTL / background-refresh activity indicators. Also the source
//! of the "hot themes" ranking the refresher works from.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::eviction::EvictionReason;

// ============================================================================
// Constants
// ============================================================================

/// Bounded ring of global build-time samples.
const MAX_GLOBAL_SAMPLES: usize = 2048;

/// Bounded ring of per-theme build-time samples.
const MAX_THEME_SAMPLES: usize = 256;

// ============================================================================
// Counters
// ============================================================================

/// Monotonic event counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions_low_score: u64,
    pub evictions_overflow: u64,
    pub invalidations: u64,
    pub ttl_adaptations: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub secondary_hits: u64,
    pub curated_cards: u64,
    pub sampled_cards: u64,
    pub synthetic_cards: u64,
}

impl Counters {
    /// Cache hit rate over all lookups; 0.0 before any traffic.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// Per-theme stats
// ============================================================================

#[derive(Debug, Default)]
struct ThemeStats {
    requests: u64,
    hits: u64,
    misses: u64,
    builds: u64,
    build_samples: VecDeque<f64>,
}

/// Snapshot form of one theme's stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeMetrics {
    pub theme: String,
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub build_p50_ms: Option<f64>,
    pub build_p95_ms: Option<f64>,
}

// ============================================================================
// MetricsSnapshot
// ============================================================================

/// Serializable snapshot for the web layer and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub counters: Counters,
    pub hit_rate: f64,
    pub build_p50_ms: Option<f64>,
    pub build_p95_ms: Option<f64>,
    /// Per-theme stats, most-requested first.
    pub themes: Vec<ThemeMetrics>,
}

// ============================================================================
// PreviewMetrics
// ============================================================================

struct MetricsInner {
    counters: Counters,
    build_samples: VecDeque<f64>,
    per_theme: HashMap<String, ThemeStats>,
}

/// Thread-safe metrics aggregator.
pub struct PreviewMetrics {
    inner: Mutex<MetricsInner>,
}

impl Default for PreviewMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner {
                counters: Counters::default(),
                build_samples: VecDeque::with_capacity(MAX_GLOBAL_SAMPLES),
                per_theme: HashMap::new(),
            }),
        }
    }

    pub fn record_request(&self, theme: &str) {
        let mut inner = self.lock();
        inner.counters.requests += 1;
        inner.per_theme.entry(theme.to_string()).or_default().requests += 1;
    }

    pub fn record_hit(&self, theme: &str) {
        let mut inner = self.lock();
        inner.counters.hits += 1;
        inner.per_theme.entry(theme.to_string()).or_default().hits += 1;
    }

    pub fn record_miss(&self, theme: &str) {
        let mut inner = self.lock();
        inner.counters.misses += 1;
        inner.per_theme.entry(theme.to_string()).or_default().misses += 1;
    }

    pub fn record_build(
        &self,
        theme: &str,
        build_ms: f64,
        curated: usize,
        sampled: usize,
        synthetic: usize,
    ) {
        let mut inner = self.lock();
        inner.counters.curated_cards += curated as u64;
        inner.counters.sampled_cards += sampled as u64;
        inner.counters.synthetic_cards += synthetic as u64;
        push_bounded(&mut inner.build_samples, build_ms, MAX_GLOBAL_SAMPLES);

        let stats = inner.per_theme.entry(theme.to_string()).or_default();
        stats.builds += 1;
        push_bounded(&mut stats.build_samples, build_ms, MAX_THEME_SAMPLES);
    }

    pub fn record_evictions(&self, reason: EvictionReason, count: u64) {
        let mut inner = self.lock();
        match reason {
            EvictionReason::LowScore => inner.counters.evictions_low_score += count,
            EvictionReason::EmergencyOverflow => inner.counters.evictions_overflow += count,
        }
    }

    pub fn record_invalidations(&self, count: u64) {
        self.lock().counters.invalidations += count;
    }

    pub fn record_ttl_adaptations(&self, count: u64) {
        self.lock().counters.ttl_adaptations += count;
    }

    pub fn record_refresh(&self, success: bool) {
        let mut inner = self.lock();
        if success {
            inner.counters.refreshes += 1;
        } else {
            inner.counters.refresh_failures += 1;
        }
    }

    pub fn record_secondary_hit(&self) {
        self.lock().counters.secondary_hits += 1;
    }

    /// The `count` most-requested themes, descending; name order breaks
    /// ties so the refresher's work list is deterministic.
    pub fn hot_themes(&self, count: usize) -> Vec<String> {
        let inner = self.lock();
        let mut ranked: Vec<(&String, u64)> = inner
            .per_theme
            .iter()
            .map(|(theme, stats)| (theme, stats.requests))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(count)
            .map(|(theme, _)| theme.clone())
            .collect()
    }

    /// p95 over the recent global build samples, for the refresher's
    /// adaptive interval.
    pub fn recent_build_p95(&self) -> Option<f64> {
        let inner = self.lock();
        percentile(inner.build_samples.iter().copied(), 95.0)
    }

    /// Ratio of failed refreshes over all refresh attempts.
    pub fn refresh_failure_rate(&self) -> f64 {
        let inner = self.lock();
        let total = inner.counters.refreshes + inner.counters.refresh_failures;
        if total == 0 {
            0.0
        } else {
            inner.counters.refresh_failures as f64 / total as f64
        }
    }

    /// Full serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        let mut themes: Vec<ThemeMetrics> = inner
            .per_theme
            .iter()
            .map(|(theme, stats)| ThemeMetrics {
                theme: theme.clone(),
                requests: stats.requests,
                hits: stats.hits,
                misses: stats.misses,
                builds: stats.builds,
                build_p50_ms: percentile(stats.build_samples.iter().copied(), 50.0),
                build_p95_ms: percentile(stats.build_samples.iter().copied(), 95.0),
            })
            .collect();
        themes.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.theme.cmp(&b.theme)));

        MetricsSnapshot {
            hit_rate: inner.counters.hit_rate(),
            build_p50_ms: percentile(inner.build_samples.iter().copied(), 50.0),
            build_p95_ms: percentile(inner.build_samples.iter().copied(), 95.0),
            counters: inner.counters.clone(),
            themes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsInner> {
        // Counter updates cannot poison meaningfully; recover the guard.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn push_bounded(samples: &mut VecDeque<f64>, value: f64, max: usize) {
    if samples.len() == max {
        samples.pop_front();
    }
    samples.push_back(value);
}

/// Nearest-rank percentile; `None` for an empty sample set.
fn percentile<I: Iterator<Item = f64>>(samples: I, pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = samples.collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}

// ============================================================================
// Tests
// ============================================================================
