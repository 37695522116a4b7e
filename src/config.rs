//! Tuning configuration for the preview engine.
//!
//! All knobs live in one immutable [`PreviewConfig`] value resolved once at
//! startup (or injected in tests). Hot-path code never re-reads ambient
//! configuration. Every field has a sane default; `THEMESCOPE_*` environment
//! variables may override a subset of them via [`PreviewConfig::from_env`].

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// PreviewConfig - top level
// ============================================================================

/// Top-level configuration for the preview engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    pub cache: CacheSettings,
    pub eviction: EvictionWeights,
    pub ttl: TtlSettings,
    pub sampler: SamplerSettings,
    pub refresh: RefreshSettings,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            eviction: EvictionWeights::default(),
            ttl: TtlSettings::default(),
            sampler: SamplerSettings::default(),
            refresh: RefreshSettings::default(),
        }
    }
}

// ============================================================================
// CacheSettings
// ============================================================================

/// Capacity and eviction-pass behavior of the preview cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheSettings {
    /// Maximum number of cached previews before eviction kicks in.
    pub capacity: usize,

    /// Multiple of `capacity` beyond which the O(n) scored eviction pass is
    /// skipped in favor of a pure age sweep (the emergency-overflow path).
    pub overflow_factor: f64,

    /// Minimum milliseconds between scored eviction passes. Bursts of unique
    /// keys inside this window accumulate until the overflow sweep fires.
    pub eviction_debounce_ms: u64,

    /// Build-cost bucket thresholds in milliseconds. An entry's cost bucket
    /// is the number of thresholds its build cost exceeds (0..=3).
    pub cost_bucket_ms: [f64; 3],
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 256,
            overflow_factor: 2.0,
            eviction_debounce_ms: 50,
            cost_bucket_ms: [25.0, 60.0, 150.0],
        }
    }
}

// ============================================================================
// EvictionWeights
// ============================================================================

/// Weights for the composite protection score used by scored eviction.
///
/// `protection = w_hits * ln(1 + hits) + w_recency * recency
///             + w_cost * cost_bucket - w_age * age`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvictionWeights {
    pub hits: f64,
    pub recency: f64,
    pub cost: f64,
    pub age: f64,
}

impl Default for EvictionWeights {
    fn default() -> Self {
        Self {
            hits: 1.0,
            recency: 1.5,
            cost: 0.75,
            age: 0.5,
        }
    }
}

// ============================================================================
// TtlSettings
// ============================================================================

/// Adaptive TTL band ladder.
///
/// An entry's effective TTL is the band whose hit threshold it has reached.
/// Bands are recalculated on a schedule, never on every access, and an
/// entry's TTL never shrinks purely from popularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TtlSettings {
    /// TTL bands in seconds, ascending. `bands_secs[0]` is the base TTL
    /// assigned to fresh entries.
    pub bands_secs: Vec<u64>,

    /// Hit counts required to earn each band. Must be the same length as
    /// `bands_secs`; the first threshold is conventionally 0.
    pub hit_thresholds: Vec<u64>,

    /// How often (seconds) the band recalculation pass may run.
    pub recalc_interval_secs: u64,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            bands_secs: vec![120, 300, 900, 1800],
            hit_thresholds: vec![0, 8, 32, 128],
            recalc_interval_secs: 60,
        }
    }
}

impl TtlSettings {
    /// Base TTL in seconds for a freshly inserted entry.
    pub fn base_secs(&self) -> u64 {
        self.bands_secs.first().copied().unwrap_or(120)
    }

    /// The TTL band earned by `hit_count`, in seconds.
    ///
    /// Monotonic in `hit_count`: more hits never select a shorter band.
    pub fn band_for_hits(&self, hit_count: u64) -> u64 {
        let mut band = self.base_secs();
        for (secs, threshold) in self.bands_secs.iter().zip(&self.hit_thresholds) {
            if hit_count >= *threshold {
                band = band.max(*secs);
            }
        }
        band
    }
}

// ============================================================================
// SamplerSettings
// ============================================================================

/// Hand-tuned scoring constants for the sampling pipeline.
///
/// These are deliberately plain constants, not learned weights. The specific
/// defaults are calibration placeholders; the monotonic shapes (diminishing
/// rarity returns, diminishing overlap gain) are the real contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplerSettings {
    /// Base score priors per role: payoff, enabler, support, wildcard.
    pub role_priors: [f64; 4],

    /// Rarity bonuses: common, uncommon, rare, mythic.
    pub rarity_bonus: [f64; 4],

    /// Geometric decay applied per already-selected card of the same rarity.
    pub rarity_decay: f64,

    /// Bonus for the first synergy tag shared with the commander.
    pub overlap_bonus: f64,

    /// Geometric decay per additional distinct shared tag.
    pub overlap_decay: f64,

    /// Base penalty for an off-color card admitted via splash leniency.
    pub splash_penalty: f64,

    /// Penalty scale keyed by commander color count. Wider identities are
    /// penalized less; missing counts scale by 1.0.
    pub splash_scale: HashMap<u8, f64>,

    /// Target sample shares per role bucket: payoff, enabler+support,
    /// wildcard. Soft quotas, enforced as saturation penalties.
    pub role_targets: [f64; 3],

    /// Penalty applied to candidates whose role bucket already holds its
    /// target share of the sample.
    pub saturation_penalty: f64,

    /// Maximum curated cards inserted ahead of scored candidates.
    pub curated_cap: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        let mut splash_scale = HashMap::new();
        splash_scale.insert(4, 0.6);
        splash_scale.insert(5, 0.4);

        Self {
            role_priors: [1.0, 0.85, 0.7, 0.5],
            rarity_bonus: [0.0, 0.1, 0.25, 0.4],
            rarity_decay: 0.5,
            overlap_bonus: 0.4,
            overlap_decay: 0.6,
            splash_penalty: 0.3,
            splash_scale,
            role_targets: [0.4, 0.4, 0.2],
            saturation_penalty: 0.25,
            curated_cap: 5,
        }
    }
}

impl SamplerSettings {
    /// Splash penalty scale factor for a commander with `color_count` colors.
    pub fn splash_scale_for(&self, color_count: u8) -> f64 {
        self.splash_scale.get(&color_count).copied().unwrap_or(1.0)
    }
}

// ============================================================================
// RefreshSettings
// ============================================================================

/// Background refresher behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshSettings {
    /// Master switch. Disabled refreshers never spawn; the on-demand path
    /// is unaffected.
    pub enabled: bool,

    /// Lower bound on the adaptive polling interval, seconds.
    pub min_interval_secs: u64,

    /// Upper bound on the adaptive polling interval, seconds.
    pub max_interval_secs: u64,

    /// Initial polling interval, seconds.
    pub initial_interval_secs: u64,

    /// How many of the most-requested themes are eligible per tick.
    pub top_themes: usize,

    /// Entries whose remaining TTL is below this window are refreshed.
    pub expiry_window_secs: u64,

    /// Recent build p95 (ms) above which the interval is shortened.
    pub p95_threshold_ms: f64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_secs: 15,
            max_interval_secs: 120,
            initial_interval_secs: 30,
            top_themes: 8,
            expiry_window_secs: 45,
            p95_threshold_ms: 60.0,
        }
    }
}

// ============================================================================
// Environment overrides
// ============================================================================

impl PreviewConfig {
    /// Resolve configuration from defaults plus `THEMESCOPE_*` environment
    /// overrides. Unparseable values are logged and ignored rather than
    /// failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse::<usize>("THEMESCOPE_CACHE_CAPACITY") {
            config.cache.capacity = v;
        }
        if let Some(v) = env_parse::<f64>("THEMESCOPE_OVERFLOW_FACTOR") {
            config.cache.overflow_factor = v;
        }
        if let Some(v) = env_parse::<f64>("THEMESCOPE_EVICT_W_HITS") {
            config.eviction.hits = v;
        }
        if let Some(v) = env_parse::<f64>("THEMESCOPE_EVICT_W_RECENCY") {
            config.eviction.recency = v;
        }
        if let Some(v) = env_parse::<f64>("THEMESCOPE_EVICT_W_COST") {
            config.eviction.cost = v;
        }
        if let Some(v) = env_parse::<f64>("THEMESCOPE_EVICT_W_AGE") {
            config.eviction.age = v;
        }
        if let Some(v) = env_parse::<u64>("THEMESCOPE_TTL_RECALC_SECS") {
            config.ttl.recalc_interval_secs = v;
        }
        if let Some(v) = env_parse::<f64>("THEMESCOPE_SPLASH_PENALTY") {
            config.sampler.splash_penalty = v;
        }
        if let Some(v) = env_parse::<usize>("THEMESCOPE_CURATED_CAP") {
            config.sampler.curated_cap = v;
        }
        if let Some(v) = env_parse::<bool>("THEMESCOPE_REFRESH_ENABLED") {
            config.refresh.enabled = v;
        }
        if let Some(v) = env_parse::<u64>("THEMESCOPE_REFRESH_MIN_SECS") {
            config.refresh.min_interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("THEMESCOPE_REFRESH_MAX_SECS") {
            config.refresh.max_interval_secs = v;
        }

        config
    }
}

/// Parse an environment variable, logging a warning when the value is
/// present but unparseable.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring unparseable {key}={raw}");
                None
            }
        },
        Err(_) => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
