//! Bounded in-memory preview cache with adaptive TTL and composite-score
//! eviction.
//!
//! # Locking
//!
//! One coarse `tokio::sync::Mutex` guards the entry map and all per-entry
//! bookkeeping. Entry mutation is O(1) and no scoring work happens under
//! the lock (payloads are built before `put`), so contention stays low.
//! Two sequential `get`s on the same key without an intervening
//! invalidation observe monotonically non-decreasing hit counts.
//!
//! # Eviction
//!
//! `put` enforces capacity through the [`EvictionStrategy`] seam. Scored
//! passes are debounced (they are O(n)); if a burst of unique keys pushes
//! the map past `capacity * overflow_factor` the emergency age sweep runs
//! immediately and is reported separately to metrics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::eviction::{AgeSweep, EvictionStrategy, ScoredScan};
use super::metrics::PreviewMetrics;
use super::types::{PreviewPayload, PreviewQuery};
use crate::config::{CacheSettings, EvictionWeights, TtlSettings};

// ============================================================================
// CacheEntry
// ============================================================================

/// One cached preview with its bookkeeping. Mutated in place on hits,
/// replaced wholesale on rebuild, removed on eviction or bust.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub(crate) payload: Arc<PreviewPayload>,
    pub(crate) query: PreviewQuery,
    pub(crate) inserted_at: Instant,
    pub(crate) last_access: Instant,
    pub(crate) hit_count: u64,
    pub(crate) build_cost_ms: f64,
    /// Effective TTL; starts at the base band and may be promoted by the
    /// scheduled recalculation, never demoted by popularity.
    pub(crate) ttl: Duration,
}

impl CacheEntry {
    fn new(query: PreviewQuery, payload: Arc<PreviewPayload>, build_cost_ms: f64, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            payload,
            query,
            inserted_at: now,
            last_access: now,
            hit_count: 0,
            build_cost_ms,
            ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }

    fn remaining_ttl(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.inserted_at))
    }

    #[cfg(test)]
    pub(crate) fn for_test(
        hit_count: u64,
        build_cost_ms: f64,
        inserted_at: Instant,
        last_access: Instant,
    ) -> Self {
        use chrono::Utc;
        let payload = Arc::new(PreviewPayload {
            theme: "test".to_string(),
            commander: None,
            entries: Vec::new(),
            curated_count: 0,
            sampled_count: 0,
            synthetic_count: 0,
            is_empty: true,
            seed: 0,
            build_ms: build_cost_ms,
            generated_at: Utc::now(),
        });
        Self {
            payload,
            query: PreviewQuery::new("test"),
            inserted_at,
            last_access,
            hit_count,
            build_cost_ms,
            ttl: Duration::from_secs(3600),
        }
    }
}

// ============================================================================
// PreviewCache
// ============================================================================

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Last scored eviction pass; passes are debounced because they scan
    /// the whole map.
    last_scored_pass: Option<Instant>,
    last_ttl_recalc: Instant,
}

/// Bounded preview cache. See module docs for the locking and eviction
/// story.
pub struct PreviewCache {
    inner: Mutex<CacheInner>,
    settings: CacheSettings,
    ttl_settings: TtlSettings,
    scored: ScoredScan,
    sweep: AgeSweep,
    metrics: Arc<PreviewMetrics>,
}

impl PreviewCache {
    pub fn new(
        settings: CacheSettings,
        weights: EvictionWeights,
        ttl_settings: TtlSettings,
        metrics: Arc<PreviewMetrics>,
    ) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                last_scored_pass: None,
                last_ttl_recalc: Instant::now(),
            }),
            scored: ScoredScan {
                weights,
                settings: settings.clone(),
            },
            sweep: AgeSweep,
            settings,
            ttl_settings,
            metrics,
        }
    }

    /// Look up a cached preview. On a hit, bumps `hit_count` and
    /// `last_access` under the lock; expired entries are dropped and
    /// reported as `None`.
    pub async fn get(&self, key: &str) -> Option<Arc<PreviewPayload>> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        match inner.entries.get_mut(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.entries.remove(key);
                None
            }
            Some(entry) => {
                entry.hit_count += 1;
                entry.last_access = now;
                Some(entry.payload.clone())
            }
            None => None,
        }
    }

    /// Insert a freshly built preview, evicting if over capacity.
    pub async fn put(&self, query: &PreviewQuery, payload: Arc<PreviewPayload>, build_cost_ms: f64) {
        let key = query.cache_key();
        let base_ttl = Duration::from_secs(self.ttl_settings.base_secs());
        let entry = CacheEntry::new(query.clone(), payload, build_cost_ms, base_ttl);

        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        self.maybe_recalc_ttls(&mut inner, now);
        inner.entries.insert(key, entry);
        self.enforce_capacity(&mut inner, now);
    }

    /// Remove all entries for one theme, or everything.
    pub async fn invalidate(&self, theme: Option<&str>) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        match theme {
            Some(theme) => {
                let theme = crate::core::catalog::normalize_theme(theme);
                inner.entries.retain(|_, entry| entry.query.theme != theme);
            }
            None => inner.entries.clear(),
        }
        let removed = before - inner.entries.len();
        if removed > 0 {
            self.metrics.record_invalidations(removed as u64);
            log::debug!("Preview cache invalidated {removed} entries");
        }
        removed
    }

    /// Queries whose entries expire within `window`; the refresher's work
    /// list.
    pub async fn keys_near_expiry(&self, window: Duration) -> Vec<PreviewQuery> {
        let now = Instant::now();
        let inner = self.inner.lock().await;
        inner
            .entries
            .values()
            .filter(|entry| entry.remaining_ttl(now) <= window)
            .map(|entry| entry.query.clone())
            .collect()
    }

    /// Run the TTL band recalculation now, regardless of schedule.
    /// Returns the number of entries promoted.
    pub async fn force_ttl_recalc(&self) -> usize {
        let mut inner = self.inner.lock().await;
        self.recalc_ttls(&mut inner)
    }

    /// Bookkeeping snapshot of one entry, for tests and diagnostics.
    pub async fn entry_stats(&self, key: &str) -> Option<(u64, Duration)> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .map(|entry| (entry.hit_count, entry.ttl))
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.settings.capacity
    }

    // ========================================================================
    // Internal helpers (called with the lock held)
    // ========================================================================

    fn enforce_capacity(&self, inner: &mut CacheInner, now: Instant) {
        let len = inner.entries.len();
        let capacity = self.settings.capacity.max(1);
        if len <= capacity {
            return;
        }

        let overflow_at = (capacity as f64 * self.settings.overflow_factor) as usize;
        let strategy: &dyn EvictionStrategy = if len > overflow_at {
            &self.sweep
        } else {
            // Debounce the O(n) scored pass; bursts accumulate until the
            // overflow sweep takes over.
            let debounce = Duration::from_millis(self.settings.eviction_debounce_ms);
            match inner.last_scored_pass {
                Some(last) if now.saturating_duration_since(last) < debounce => return,
                _ => {}
            }
            inner.last_scored_pass = Some(now);
            &self.scored
        };

        let victims = strategy.select_victims(&inner.entries, now, capacity);
        if victims.is_empty() {
            return;
        }
        let reason = strategy.reason();
        for key in &victims {
            inner.entries.remove(key);
        }
        self.metrics.record_evictions(reason, victims.len() as u64);
        log::debug!(
            "Preview cache evicted {} entries ({reason:?})",
            victims.len()
        );
    }

    fn maybe_recalc_ttls(&self, inner: &mut CacheInner, now: Instant) {
        let interval = Duration::from_secs(self.ttl_settings.recalc_interval_secs);
        if now.saturating_duration_since(inner.last_ttl_recalc) < interval {
            return;
        }
        inner.last_ttl_recalc = now;
        self.recalc_ttls(inner);
    }

    fn recalc_ttls(&self, inner: &mut CacheInner) -> usize {
        let mut promoted = 0;
        for entry in inner.entries.values_mut() {
            let earned = Duration::from_secs(self.ttl_settings.band_for_hits(entry.hit_count));
            // Bands never shrink purely from popularity.
            if earned > entry.ttl {
                entry.ttl = earned;
                promoted += 1;
            }
        }
        if promoted > 0 {
            self.metrics.record_ttl_adaptations(promoted as u64);
        }
        promoted
    }
}

// ============================================================================
// Tests
// ============================================================================
