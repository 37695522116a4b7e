//! Eviction strategies for the preview cache.
//!
//! Two independently testable paths behind one seam:
//!
//! - [`ScoredScan`] — the normal path: rank every entry by a composite
//!   protection score and evict the least protected until back under
//!   capacity.
//! - [`AgeSweep`] — the emergency-overflow path: when a burst of unique
//!   keys balloons the cache past its overflow threshold, skip the O(n)
//!   scoring pass and sweep oldest-first to bound eviction latency.
//!
//! The cache selects the strategy by threshold and reports the reason to
//! the metrics aggregator.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::cache::CacheEntry;
use crate::config::{CacheSettings, EvictionWeights};

// ============================================================================
// EvictionReason
// ============================================================================

/// Why an entry was evicted; broken out in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvictionReason {
    /// Lowest composite protection score under normal pressure.
    LowScore,
    /// Oldest-first sweep on the emergency overflow path.
    EmergencyOverflow,
}

// ============================================================================
// Protection score
// ============================================================================

/// Composite protection score for one cache entry.
///
/// Higher is safer: frequently hit, recently accessed, expensive-to-rebuild
/// entries are protected; old entries are penalized. Monotonic in each
/// component by construction.
pub fn protection_score(
    entry: &CacheEntry,
    now: Instant,
    weights: &EvictionWeights,
    settings: &CacheSettings,
) -> f64 {
    let hits = (1.0 + entry.hit_count as f64).ln();

    // Recency decays toward zero over idle minutes.
    let idle_minutes = now
        .saturating_duration_since(entry.last_access)
        .as_secs_f64()
        / 60.0;
    let recency = 1.0 / (1.0 + idle_minutes);

    let cost_bucket = settings
        .cost_bucket_ms
        .iter()
        .filter(|threshold| entry.build_cost_ms > **threshold)
        .count() as f64;

    let age_minutes = now
        .saturating_duration_since(entry.inserted_at)
        .as_secs_f64()
        / 60.0;

    weights.hits * hits + weights.recency * recency + weights.cost * cost_bucket
        - weights.age * age_minutes
}

// ============================================================================
// EvictionStrategy
// ============================================================================

/// Selects the keys to evict so the cache shrinks to `target_len`.
pub trait EvictionStrategy: Send + Sync {
    fn reason(&self) -> EvictionReason;

    /// Keys to remove, least-protected first. Returns an empty vector when
    /// the cache is already within `target_len`.
    fn select_victims(
        &self,
        entries: &HashMap<String, CacheEntry>,
        now: Instant,
        target_len: usize,
    ) -> Vec<String>;
}

// ============================================================================
// ScoredScan
// ============================================================================

/// Full protection-score scan; the normal eviction path.
pub struct ScoredScan {
    pub weights: EvictionWeights,
    pub settings: CacheSettings,
}

impl EvictionStrategy for ScoredScan {
    fn reason(&self) -> EvictionReason {
        EvictionReason::LowScore
    }

    fn select_victims(
        &self,
        entries: &HashMap<String, CacheEntry>,
        now: Instant,
        target_len: usize,
    ) -> Vec<String> {
        if entries.len() <= target_len {
            return Vec::new();
        }
        let excess = entries.len() - target_len;

        let mut scored: Vec<(f64, &String)> = entries
            .iter()
            .map(|(key, entry)| (protection_score(entry, now, &self.weights, &self.settings), key))
            .collect();
        // Ties broken by key for a stable victim order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.1.cmp(b.1)));

        scored
            .into_iter()
            .take(excess)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

// ============================================================================
// AgeSweep
// ============================================================================

/// Pure oldest-first sweep; the emergency-overflow path.
pub struct AgeSweep;

impl EvictionStrategy for AgeSweep {
    fn reason(&self) -> EvictionReason {
        EvictionReason::EmergencyOverflow
    }

    fn select_victims(
        &self,
        entries: &HashMap<String, CacheEntry>,
        _now: Instant,
        target_len: usize,
    ) -> Vec<String> {
        if entries.len() <= target_len {
            return Vec::new();
        }
        let excess = entries.len() - target_len;

        let mut by_age: Vec<(&Instant, &String)> = entries
            .iter()
            .map(|(key, entry)| (&entry.inserted_at, key))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));

        by_age
            .into_iter()
            .take(excess)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
