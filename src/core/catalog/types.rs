//! Core data models for the card catalog.
//!
//! A [`CardRecord`] is the immutable normalized view of one card, built once
//! per index load and never mutated in place. Raw rows arrive as
//! [`RawCardRow`] from whatever produced the card dump (CSV ETL is a
//! collaborator, not owned here) and are normalized during index build.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Canonical pip ordering for color identity normalization.
pub const WUBRG: [char; 5] = ['W', 'U', 'B', 'R', 'G'];

// ============================================================================
// Rarity
// ============================================================================

/// Card rarity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
}

impl Rarity {
    /// Lenient parse; unrecognized or malformed values fall back to
    /// `Common` rather than failing the load.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uncommon" => Rarity::Uncommon,
            "rare" => Rarity::Rare,
            "mythic" | "mythic rare" => Rarity::Mythic,
            _ => Rarity::Common,
        }
    }

    /// Index into rarity-keyed constant tables (common = 0 .. mythic = 3).
    pub fn bucket(self) -> usize {
        match self {
            Rarity::Common => 0,
            Rarity::Uncommon => 1,
            Rarity::Rare => 2,
            Rarity::Mythic => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Mythic => "mythic",
        }
    }
}

// ============================================================================
// RawCardRow - pre-normalization input
// ============================================================================

/// One row of the already-parsed card dump, prior to normalization.
///
/// Every field except `name` is optional; malformed or missing values are
/// defaulted per-row during index build instead of aborting the load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCardRow {
    pub name: String,
    pub mana_cost: String,
    pub mana_value: Option<f64>,
    pub color_identity: Vec<String>,
    pub rarity: String,
    pub type_line: String,
    pub theme_tags: Vec<String>,
    pub synergy_tags: Vec<String>,
    /// Themes for which this card is pinned as a canonical example.
    pub curated_themes: Vec<String>,
}

// ============================================================================
// CardRecord - normalized card
// ============================================================================

/// Immutable normalized view of one card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub name: String,
    pub mana_cost: String,
    pub mana_value: f64,
    /// Ordered color identity pips (WUBRG order, deduplicated).
    pub color_identity: Vec<char>,
    /// Colored pip multiset taken from the mana cost.
    pub pip_colors: Vec<char>,
    pub rarity: Rarity,
    pub type_line: String,
    pub theme_tags: HashSet<String>,
    pub synergy_tags: HashSet<String>,
    pub curated_themes: HashSet<String>,
}

impl CardRecord {
    /// True when this card's color identity fits within `filter` plus
    /// colorless (a colorless card fits every filter).
    pub fn fits_colors(&self, filter: &[char]) -> bool {
        self.color_identity.iter().all(|pip| filter.contains(pip))
    }

    /// Whether this card is pinned as a canonical example for `theme`.
    pub fn is_curated_for(&self, theme: &str) -> bool {
        self.curated_themes.contains(theme)
    }

    /// Count of distinct synergy tags shared with `other`'s tags.
    pub fn shared_synergy_count(&self, other: &CardRecord) -> usize {
        self.synergy_tags
            .iter()
            .filter(|tag| other.synergy_tags.contains(*tag))
            .count()
    }
}

// ============================================================================
// Normalization helpers
// ============================================================================

/// Normalize a list of color strings into deduplicated WUBRG-ordered pips.
///
/// Accepts single letters in any case; unknown symbols are dropped. The
/// result is order-independent: `["G", "w"]` and `["W", "g"]` normalize
/// identically so cache keys built from them match.
pub fn normalize_colors<S: AsRef<str>>(raw: &[S]) -> Vec<char> {
    let mut present = [false; 5];
    for value in raw {
        for ch in value.as_ref().chars() {
            let upper = ch.to_ascii_uppercase();
            if let Some(pos) = WUBRG.iter().position(|p| *p == upper) {
                present[pos] = true;
            }
        }
    }
    WUBRG
        .iter()
        .zip(present)
        .filter_map(|(pip, seen)| seen.then_some(*pip))
        .collect()
}

/// Extract the colored pip multiset from a mana cost string like
/// `"{1}{W}{W}{U}"`. Generic and variable symbols are ignored.
pub fn pip_multiset(mana_cost: &str) -> Vec<char> {
    mana_cost
        .chars()
        .filter_map(|ch| {
            let upper = ch.to_ascii_uppercase();
            WUBRG.contains(&upper).then_some(upper)
        })
        .collect()
}

/// Normalize a theme name for membership and cache-key lookups.
pub fn normalize_theme(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a card name for case-insensitive lookup.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ============================================================================
// Tests
// ============================================================================
