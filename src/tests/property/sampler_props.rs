//! Property-based tests for the preview sampler
//!
//! Tests invariants:
//! - Same query yields the same payload, in the same order
//! - Payload length equals the clamped limit exactly
//! - Seeds depend only on theme and commander
//! - Rarity bonuses are monotonic in rarity and diminish with repeats
//! - Overlap bonuses are monotonic with diminishing returns

use proptest::prelude::*;

use crate::config::SamplerSettings;
use crate::core::catalog::index::build_snapshot;
use crate::core::catalog::{CatalogSnapshot, RawCardRow, Rarity};
use crate::core::preview::sampler::{overlap_bonus, rarity_bonus, sample_preview};
use crate::core::preview::types::PreviewQuery;

// ============================================================================
// Strategies for generating test inputs
// ============================================================================

/// Generate an arbitrary rarity string as it would appear in catalog data.
fn arb_rarity_str() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("common".to_string()),
        Just("uncommon".to_string()),
        Just("rare".to_string()),
        Just("mythic".to_string()),
    ]
}

/// Generate a non-empty pool of distinct cards, all members of "alpha".
fn arb_pool() -> impl Strategy<Value = Vec<RawCardRow>> {
    prop::collection::vec((arb_rarity_str(), 0.0f64..10.0), 1..40).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(index, (rarity, mana_value))| RawCardRow {
                name: format!("Card {index}"),
                rarity,
                mana_value: Some(mana_value),
                theme_tags: vec!["alpha".to_string()],
                ..Default::default()
            })
            .collect()
    })
}

fn arb_rarity() -> impl Strategy<Value = Rarity> {
    prop_oneof![
        Just(Rarity::Common),
        Just(Rarity::Uncommon),
        Just(Rarity::Rare),
        Just(Rarity::Mythic),
    ]
}

fn snapshot_for(rows: Vec<RawCardRow>) -> CatalogSnapshot {
    build_snapshot(rows)
}

// ============================================================================
// Properties: sampling
// ============================================================================

proptest! {
    /// The same query against the same snapshot always produces the same
    /// payload, entry for entry.
    #[test]
    fn prop_sampling_is_deterministic(rows in arb_pool(), limit in 1usize..24) {
        let snapshot = snapshot_for(rows);
        let settings = SamplerSettings::default();
        let query = PreviewQuery::new("alpha").with_limit(limit);

        let first = sample_preview(&snapshot, &query, &settings);
        let second = sample_preview(&snapshot, &query, &settings);

        prop_assert_eq!(first.seed, second.seed);
        prop_assert_eq!(first.entries, second.entries);
    }

    /// A non-empty theme always fills the payload to exactly the requested
    /// limit, padding with synthetic placeholders when the pool runs dry.
    #[test]
    fn prop_payload_length_is_exact(rows in arb_pool(), limit in 0usize..24) {
        let pool_size = rows.len();
        let snapshot = snapshot_for(rows);
        let settings = SamplerSettings::default();
        let query = PreviewQuery::new("alpha").with_limit(limit);

        let payload = sample_preview(&snapshot, &query, &settings);
        let expected = limit.max(1);

        prop_assert_eq!(payload.entries.len(), expected);
        prop_assert!(!payload.is_empty);
        if pool_size >= expected {
            prop_assert_eq!(payload.synthetic_count, 0);
        } else {
            prop_assert_eq!(payload.synthetic_count, expected - pool_size);
        }
    }

    /// Real entries never repeat a card name within one payload.
    #[test]
    fn prop_no_duplicate_entries(rows in arb_pool(), limit in 1usize..24) {
        let snapshot = snapshot_for(rows);
        let settings = SamplerSettings::default();
        let query = PreviewQuery::new("alpha").with_limit(limit);

        let payload = sample_preview(&snapshot, &query, &settings);
        let mut names: Vec<&str> = payload
            .entries
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), payload.entries.len());
    }

    /// The sampling seed is a function of theme and commander only; limit
    /// and color filters never perturb the shuffle.
    #[test]
    fn prop_seed_ignores_limit_and_colors(
        limit_a in 1usize..24,
        limit_b in 1usize..24,
        commander in prop::option::of("[A-Za-z ]{1,20}"),
    ) {
        let base = PreviewQuery::new("alpha");
        let base = match &commander {
            Some(name) => base.with_commander(name),
            None => base,
        };

        let with_limit = base.clone().with_limit(limit_a);
        let with_other = base
            .clone()
            .with_limit(limit_b)
            .with_colors(&["W", "U"]);

        prop_assert_eq!(with_limit.sample_seed(), with_other.sample_seed());
    }
}

// ============================================================================
// Properties: scoring components
// ============================================================================

proptest! {
    /// With default weights a rarer card never scores a smaller first-pick
    /// bonus than a more common one.
    #[test]
    fn prop_rarity_bonus_monotonic_in_rarity(already in 0usize..10) {
        let settings = SamplerSettings::default();
        let ladder = [Rarity::Common, Rarity::Uncommon, Rarity::Rare, Rarity::Mythic];
        for pair in ladder.windows(2) {
            prop_assert!(
                rarity_bonus(&settings, pair[0], already)
                    <= rarity_bonus(&settings, pair[1], already)
            );
        }
    }

    /// Each additional already-selected card of the same rarity shrinks the
    /// bonus, and it never goes negative.
    #[test]
    fn prop_rarity_bonus_diminishes(rarity in arb_rarity(), already in 0usize..10) {
        let settings = SamplerSettings::default();
        let current = rarity_bonus(&settings, rarity, already);
        let next = rarity_bonus(&settings, rarity, already + 1);
        prop_assert!(next <= current);
        prop_assert!(next >= 0.0);
    }

    /// Overlap bonus grows with shared tags but with diminishing increments.
    #[test]
    fn prop_overlap_bonus_monotonic_diminishing(shared in 1usize..12) {
        let settings = SamplerSettings::default();
        let prev = overlap_bonus(&settings, shared - 1);
        let current = overlap_bonus(&settings, shared);
        let next = overlap_bonus(&settings, shared + 1);

        prop_assert!(current >= prev);
        prop_assert!(next - current <= current - prev + 1e-9);
    }

    /// No shared tags means no bonus.
    #[test]
    fn prop_overlap_bonus_zero_without_overlap(_unused in 0usize..4) {
        let settings = SamplerSettings::default();
        prop_assert_eq!(overlap_bonus(&settings, 0), 0.0);
    }
}
