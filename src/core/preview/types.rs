//! Query and payload types for theme previews.
//!
//! [`PreviewQuery`] doubles as the cache key: identical inputs normalize to
//! an identical key (order-independent colors, case-insensitive names) so
//! incidental formatting differences never depress the hit rate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::catalog::{normalize_colors, normalize_theme, Rarity};

// ============================================================================
// SampleRole
// ============================================================================

/// Coarse classification of a sampled card's function in the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleRole {
    /// Pays the theme off directly.
    Payoff,
    /// Cheap piece that makes the theme function.
    Enabler,
    /// Glue that supports the plan without being the plan.
    Support,
    /// Flexible inclusion outside the main buckets.
    Wildcard,
    /// Placeholder entry with no underlying card.
    Synthetic,
}

impl SampleRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleRole::Payoff => "payoff",
            SampleRole::Enabler => "enabler",
            SampleRole::Support => "support",
            SampleRole::Wildcard => "wildcard",
            SampleRole::Synthetic => "synthetic",
        }
    }
}

// ============================================================================
// PreviewQuery - the cache key
// ============================================================================

/// Normalized parameters of one preview request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    /// Theme name, trimmed and lowercased.
    pub theme: String,
    /// Commander name, trimmed and lowercased when present.
    pub commander: Option<String>,
    /// WUBRG-ordered deduplicated color filter.
    pub colors: Option<Vec<char>>,
    /// Requested sample size. Zero is tolerated and clamped on use.
    pub limit: usize,
    /// Restrict the sample to curated cards (plus synthetic fill).
    pub curated_only: bool,
}

impl PreviewQuery {
    pub fn new(theme: &str) -> Self {
        Self {
            theme: normalize_theme(theme),
            commander: None,
            colors: None,
            limit: 12,
            curated_only: false,
        }
    }

    pub fn with_commander(mut self, commander: &str) -> Self {
        let trimmed = commander.trim();
        self.commander = (!trimmed.is_empty()).then(|| trimmed.to_lowercase());
        self
    }

    pub fn with_colors<S: AsRef<str>>(mut self, colors: &[S]) -> Self {
        self.colors = Some(normalize_colors(colors));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn curated_only(mut self, curated_only: bool) -> Self {
        self.curated_only = curated_only;
        self
    }

    /// Requested limit clamped to at least one slot.
    pub fn effective_limit(&self) -> usize {
        self.limit.max(1)
    }

    /// Canonical cache-key string. Equivalent inputs produce identical keys.
    pub fn cache_key(&self) -> String {
        fn escape_field(s: &str) -> String {
            s.replace('\\', "\\\\").replace('|', "\\|")
        }
        let colors: String = self
            .colors
            .as_ref()
            .map(|c| c.iter().collect())
            .unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}",
            escape_field(&self.theme),
            self.commander.as_deref().map(escape_field).unwrap_or_default(),
            colors,
            self.effective_limit(),
            if self.curated_only { 1 } else { 0 },
        )
    }

    /// Deterministic sampling seed derived from theme and commander.
    ///
    /// Repeated calls with identical inputs must produce identical
    /// orderings, so the seed depends on nothing else.
    pub fn sample_seed(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.theme.hash(&mut hasher);
        "|".hash(&mut hasher);
        self.commander.as_deref().unwrap_or("").hash(&mut hasher);
        hasher.finish()
    }
}

// ============================================================================
// SampledCard
// ============================================================================

/// One card in a preview sample, with the scoring trail that selected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledCard {
    /// Card name, or a clearly marked placeholder for synthetic entries.
    pub name: String,
    pub role: SampleRole,
    pub score: f64,
    /// Human-readable dominant scoring factors, for UI tooltips.
    pub reasons: Vec<String>,
    pub rarity: Option<Rarity>,
    pub mana_cost: Option<String>,
    pub is_synthetic: bool,
}

impl SampledCard {
    /// Placeholder entry used when the pool cannot fill the sample. Carries
    /// no fabricated card identity.
    pub fn synthetic(slot: usize) -> Self {
        Self {
            name: format!("Preview Slot {slot}"),
            role: SampleRole::Synthetic,
            score: 0.0,
            reasons: vec!["synthetic-fill".to_string()],
            rarity: None,
            mana_cost: None,
            is_synthetic: true,
        }
    }
}

// ============================================================================
// PreviewPayload
// ============================================================================

/// The assembled response for one preview query. Immutable once built;
/// becomes the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    pub theme: String,
    pub commander: Option<String>,
    pub entries: Vec<SampledCard>,
    pub curated_count: usize,
    pub sampled_count: usize,
    pub synthetic_count: usize,
    /// True when the theme had zero candidates. Callers decide how to
    /// render "no preview available".
    pub is_empty: bool,
    pub seed: u64,
    pub build_ms: f64,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_normalization() {
        let a = PreviewQuery::new("  Sacrifice Matters ")
            .with_commander("Teysa Karlov")
            .with_colors(&["B", "w"]);
        let b = PreviewQuery::new("sacrifice matters")
            .with_commander("  TEYSA KARLOV ")
            .with_colors(&["W", "b"]);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_limit_and_curated() {
        let base = PreviewQuery::new("tokens");
        assert_ne!(base.clone().with_limit(5).cache_key(), base.cache_key());
        assert_ne!(base.clone().curated_only(true).cache_key(), base.cache_key());
    }

    #[test]
    fn test_cache_key_escapes_delimiter() {
        let tricky = PreviewQuery::new("a|b");
        let plain = PreviewQuery::new("a").with_commander("b");
        assert_ne!(tricky.cache_key(), plain.cache_key());
    }

    #[test]
    fn test_zero_limit_clamps_to_one() {
        let query = PreviewQuery::new("tokens").with_limit(0);
        assert_eq!(query.effective_limit(), 1);
    }

    #[test]
    fn test_seed_ignores_colors_and_limit() {
        let a = PreviewQuery::new("tokens").with_limit(5);
        let b = PreviewQuery::new("tokens").with_limit(50).with_colors(&["G"]);
        assert_eq!(a.sample_seed(), b.sample_seed());
    }

    #[test]
    fn test_seed_depends_on_commander() {
        let without = PreviewQuery::new("tokens");
        let with = PreviewQuery::new("tokens").with_commander("Rhys");
        assert_ne!(without.sample_seed(), with.sample_seed());
    }

    #[test]
    fn test_blank_commander_is_none() {
        let query = PreviewQuery::new("tokens").with_commander("   ");
        assert!(query.commander.is_none());
    }

    #[test]
    fn test_synthetic_entry_is_marked() {
        let entry = SampledCard::synthetic(4);
        assert!(entry.is_synthetic);
        assert_eq!(entry.role, SampleRole::Synthetic);
        assert!(entry.rarity.is_none());
        assert!(entry.reasons.contains(&"synthetic-fill".to_string()));
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(SampleRole::Payoff.as_str(), "payoff");
        assert_eq!(SampleRole::Synthetic.as_str(), "synthetic");
    }
}
