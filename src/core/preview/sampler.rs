//! Deterministic scoring and sampling pipeline for theme previews.
//!
//! Given `(theme, commander?, colors?, limit)` the sampler selects a
//! diverse, reproducible card sample:
//!
//! 1. Seed a `StdRng` from a stable hash of theme + commander.
//! 2. Build the candidate pool from the theme membership list, applying the
//!    color filter with splash leniency for 4-5 color commanders.
//! 3. Score candidates: role prior, saturating rarity bonus, diminishing
//!    commander-overlap bonus, scaled splash penalty, role-saturation
//!    penalty.
//! 4. Insert curated cards first, fill remaining slots greedily by score,
//!    then pad with synthetic placeholders.
//! 5. Annotate every pick with human-readable reason strings.
//!
//! The pipeline is a pure function of the snapshot, query, and settings;
//! two calls with identical inputs produce byte-identical orderings.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::types::{PreviewPayload, PreviewQuery, SampleRole, SampledCard};
use crate::config::SamplerSettings;
use crate::core::catalog::{CardRecord, CatalogSnapshot, Rarity};

// ============================================================================
// Scoring primitives
// ============================================================================

/// Rarity bonus with diminishing returns.
///
/// The bonus decays geometrically per already-selected card of the same
/// rarity, so a handful of mythics never dominates a sample. Monotone in
/// rarity, strictly shrinking in `already_selected` (for nonzero bonuses).
pub fn rarity_bonus(settings: &SamplerSettings, rarity: Rarity, already_selected: usize) -> f64 {
    settings.rarity_bonus[rarity.bucket()] * settings.rarity_decay.powi(already_selected as i32)
}

/// Commander synergy-overlap bonus with diminishing marginal gain.
///
/// The first shared tag is worth `overlap_bonus`; each additional distinct
/// tag is worth `overlap_decay` times the previous one.
pub fn overlap_bonus(settings: &SamplerSettings, shared_tags: usize) -> f64 {
    let mut total = 0.0;
    let mut step = settings.overlap_bonus;
    for _ in 0..shared_tags {
        total += step;
        step *= settings.overlap_decay;
    }
    total
}

/// Splash penalty for an off-color candidate, scaled down for wide
/// commander identities.
pub fn splash_penalty(settings: &SamplerSettings, commander_colors: u8) -> f64 {
    settings.splash_penalty * settings.splash_scale_for(commander_colors)
}

/// Classify a card's function within `theme` (normalized).
///
/// Stand-in for the external tagging pipeline: cards whose synergy tags
/// name the theme itself are payoffs; otherwise mana value buckets cheap
/// enablers, mid-cost support, and expensive wildcards.
pub fn classify_role(card: &CardRecord, theme: &str) -> SampleRole {
    if card.synergy_tags.contains(theme) {
        SampleRole::Payoff
    } else if card.mana_value <= 2.0 {
        SampleRole::Enabler
    } else if card.mana_value <= 4.0 {
        SampleRole::Support
    } else {
        SampleRole::Wildcard
    }
}

/// Diversity bucket index for role quotas: payoff / enabler+support /
/// wildcard.
fn role_bucket(role: SampleRole) -> usize {
    match role {
        SampleRole::Payoff => 0,
        SampleRole::Enabler | SampleRole::Support => 1,
        SampleRole::Wildcard | SampleRole::Synthetic => 2,
    }
}

// ============================================================================
// Candidate
// ============================================================================

/// A pool member with its query-static score already applied.
struct Candidate {
    card: Arc<CardRecord>,
    role: SampleRole,
    static_score: f64,
    static_reasons: Vec<String>,
}

fn make_candidate(
    settings: &SamplerSettings,
    card: Arc<CardRecord>,
    theme: &str,
    commander: Option<&CardRecord>,
    off_color: bool,
) -> Candidate {
    let role = classify_role(&card, theme);
    let mut score = settings.role_priors[match role {
        SampleRole::Payoff => 0,
        SampleRole::Enabler => 1,
        SampleRole::Support => 2,
        _ => 3,
    }];
    let mut reasons = vec![format!("role:{}", role.as_str())];

    if let Some(commander) = commander {
        let shared = card.shared_synergy_count(commander);
        if shared > 0 {
            let bonus = overlap_bonus(settings, shared);
            score += bonus;
            reasons.push(format!("commander-overlap:+{bonus:.2}"));
        }
    }

    if off_color {
        let colors = commander.map(|c| c.color_identity.len() as u8).unwrap_or(0);
        let penalty = splash_penalty(settings, colors);
        score -= penalty;
        reasons.push(format!("splash-penalty:-{penalty:.2}"));
    }

    Candidate {
        card,
        role,
        static_score: score,
        static_reasons: reasons,
    }
}

// ============================================================================
// Sampling pipeline
// ============================================================================

/// Produce a deterministic preview sample for `query`.
pub fn sample_preview(
    snapshot: &CatalogSnapshot,
    query: &PreviewQuery,
    settings: &SamplerSettings,
) -> PreviewPayload {
    let started = Instant::now();
    let limit = query.effective_limit();
    let seed = query.sample_seed();

    let members = snapshot.cards_for_theme(&query.theme);
    if members.is_empty() {
        // Unknown or empty theme is a degenerate input, not an error, and
        // gets no synthetic padding: there is nothing real to preview.
        return empty_payload(query, seed, started);
    }

    let commander = query
        .commander
        .as_deref()
        .and_then(|name| snapshot.lookup_by_name(name))
        .map(Arc::clone);
    let commander_ref = commander.as_deref();

    // Splash leniency: a 4-5 color commander earns one penalized off-color
    // slot instead of a hard exclusion.
    let leniency = query.colors.is_some()
        && commander_ref
            .map(|c| (4..=5).contains(&c.color_identity.len()))
            .unwrap_or(false);

    // Curated cards go first, unconditionally with respect to score and
    // quota, capped small. The color filter still applies.
    let mut entries: Vec<SampledCard> = Vec::with_capacity(limit);
    let mut rarity_counts = [0usize; 4];
    let mut bucket_counts = [0usize; 3];
    let mut curated_names: Vec<String> = Vec::new();

    let curated_cap = if query.curated_only {
        limit
    } else {
        settings.curated_cap.min(limit)
    };
    for card in snapshot.curated_for_theme(&query.theme) {
        if entries.len() >= curated_cap {
            break;
        }
        if let Some(filter) = &query.colors {
            if !card.fits_colors(filter) {
                continue;
            }
        }
        let candidate = make_candidate(settings, card.clone(), &query.theme, commander_ref, false);
        let mut reasons = vec!["curated".to_string()];
        reasons.extend(candidate.static_reasons.clone());
        rarity_counts[card.rarity.bucket()] += 1;
        bucket_counts[role_bucket(candidate.role)] += 1;
        curated_names.push(card.name.clone());
        entries.push(SampledCard {
            name: card.name.clone(),
            role: candidate.role,
            score: candidate.static_score,
            reasons,
            rarity: Some(card.rarity),
            mana_cost: Some(card.mana_cost.clone()),
            is_synthetic: false,
        });
    }
    let curated_count = entries.len();

    // Candidate pool: seeded shuffle of the membership list (minus curated
    // picks), color-filtered with at most one leniency admission.
    let mut pool: Vec<Candidate> = Vec::new();
    if !query.curated_only {
        let mut shuffled: Vec<Arc<CardRecord>> = members.to_vec();
        let mut rng = StdRng::seed_from_u64(seed);
        shuffled.shuffle(&mut rng);

        let mut splash_used = false;
        for card in shuffled {
            if curated_names.contains(&card.name) {
                continue;
            }
            let off_color = match &query.colors {
                Some(filter) => !card.fits_colors(filter),
                None => false,
            };
            if off_color {
                if !leniency || splash_used {
                    continue;
                }
                splash_used = true;
            }
            pool.push(make_candidate(
                settings,
                card,
                &query.theme,
                commander_ref,
                off_color,
            ));
        }
    }

    // Greedy selection under soft diversity quotas: dynamic adjustments
    // (rarity diminishment, role saturation) are recomputed against the
    // sample built so far. Ties keep shuffled pool order.
    while entries.len() < limit && !pool.is_empty() {
        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, candidate) in pool.iter().enumerate() {
            let score = candidate.static_score
                + rarity_bonus(
                    settings,
                    candidate.card.rarity,
                    rarity_counts[candidate.card.rarity.bucket()],
                )
                + saturation_adjustment(settings, candidate.role, &bucket_counts, limit);
            if score > best_score {
                best_score = score;
                best_index = i;
            }
        }

        let candidate = pool.remove(best_index);
        let rarity_seen = rarity_counts[candidate.card.rarity.bucket()];
        let r_bonus = rarity_bonus(settings, candidate.card.rarity, rarity_seen);
        let saturation = saturation_adjustment(settings, candidate.role, &bucket_counts, limit);

        let mut reasons = candidate.static_reasons.clone();
        if r_bonus > 0.0 {
            reasons.push(format!("rarity-bonus:+{r_bonus:.2}"));
            if rarity_seen > 0 {
                reasons.push("rarity-diminished".to_string());
            }
        }
        if saturation < 0.0 {
            reasons.push(format!("role-saturation:{saturation:.2}"));
        }

        rarity_counts[candidate.card.rarity.bucket()] += 1;
        bucket_counts[role_bucket(candidate.role)] += 1;
        entries.push(SampledCard {
            name: candidate.card.name.clone(),
            role: candidate.role,
            score: candidate.static_score + r_bonus + saturation,
            reasons,
            rarity: Some(candidate.card.rarity),
            mana_cost: Some(candidate.card.mana_cost.clone()),
            is_synthetic: false,
        });
    }

    if entries.is_empty() {
        // Every candidate was filtered out; render as an empty preview
        // rather than a sample of pure placeholders.
        return empty_payload(query, seed, started);
    }

    // Synthetic placeholders complete the sample without fabricating cards.
    let sampled_count = entries.len() - curated_count;
    while entries.len() < limit {
        let slot = entries.len() + 1;
        entries.push(SampledCard::synthetic(slot));
    }
    let synthetic_count = entries.len() - curated_count - sampled_count;

    PreviewPayload {
        theme: query.theme.clone(),
        commander: query.commander.clone(),
        entries,
        curated_count,
        sampled_count,
        synthetic_count,
        is_empty: false,
        seed,
        build_ms: started.elapsed().as_secs_f64() * 1000.0,
        generated_at: Utc::now(),
    }
}

/// Negative adjustment once a role bucket holds its target share.
fn saturation_adjustment(
    settings: &SamplerSettings,
    role: SampleRole,
    bucket_counts: &[usize; 3],
    limit: usize,
) -> f64 {
    let bucket = role_bucket(role);
    let target = settings.role_targets[bucket] * limit as f64;
    if (bucket_counts[bucket] as f64) >= target {
        -settings.saturation_penalty
    } else {
        0.0
    }
}

fn empty_payload(query: &PreviewQuery, seed: u64, started: Instant) -> PreviewPayload {
    PreviewPayload {
        theme: query.theme.clone(),
        commander: query.commander.clone(),
        entries: Vec::new(),
        curated_count: 0,
        sampled_count: 0,
        synthetic_count: 0,
        is_empty: true,
        seed,
        build_ms: started.elapsed().as_secs_f64() * 1000.0,
        generated_at: Utc::now(),
    }
}

// ============================================================================
// Tests
// ============================================================================
