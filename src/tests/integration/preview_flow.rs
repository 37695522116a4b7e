//! End-to-end preview flow tests
//!
//! Each test builds a real catalog, a real engine, and drives the public
//! entry points: cold miss, warm hit, commander scoping, cache pressure,
//! background refresh, and catalog reloads.

use std::io::Write;
use std::sync::Arc;

use crate::config::PreviewConfig;
use crate::core::catalog::{load_catalog_file, CardIndex, RawCardRow};
use crate::core::preview::prelude::*;
use crate::core::preview::refresh;

// =============================================================================
// Fixtures
// =============================================================================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn card(name: &str, rarity: &str, mana_value: f64, themes: &[&str]) -> RawCardRow {
    RawCardRow {
        name: name.to_string(),
        rarity: rarity.to_string(),
        mana_value: Some(mana_value),
        theme_tags: themes.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

/// A small but realistic catalog: two themes, mixed rarities, one curated
/// pick, one commander with synergy overlap.
fn fixture_rows() -> Vec<RawCardRow> {
    let mut rows = vec![
        card("Anthem of Squirrels", "rare", 3.0, &["tokens"]),
        card("Squirrel Herald", "common", 1.0, &["tokens"]),
        card("Acorn Harvest", "common", 4.0, &["tokens"]),
        card("Deranged Hermit", "mythic", 5.0, &["tokens"]),
        card("Druid's Call", "uncommon", 2.0, &["tokens"]),
        card("Nut Collector", "rare", 7.0, &["tokens"]),
        card("Healing Salve", "common", 1.0, &["lifegain"]),
        card("Angelic Chorus", "rare", 5.0, &["lifegain"]),
    ];

    rows[0].curated_themes = vec!["tokens".to_string()];

    let mut commander = card("Chatterfang, Squirrel General", "mythic", 3.0, &["commanders"]);
    commander.color_identity = vec!["B".to_string(), "G".to_string()];
    commander.synergy_tags = vec!["squirrels".to_string()];
    rows.push(commander);

    rows[1].synergy_tags = vec!["squirrels".to_string()];
    rows
}

async fn fixture_engine(config: PreviewConfig) -> Arc<PreviewEngine> {
    let index = Arc::new(CardIndex::new());
    index.build_from_rows(fixture_rows(), false).await;
    Arc::new(PreviewEngine::new(index, config))
}

// =============================================================================
// Cold miss to warm hit
// =============================================================================

#[tokio::test]
async fn test_cold_miss_then_warm_hit() {
    init_logging();
    let engine = fixture_engine(PreviewConfig::default()).await;
    let query = PreviewQuery::new("tokens").with_limit(5);

    let cold = engine.get_theme_preview(&query).await.unwrap();
    assert_eq!(cold.entries.len(), 5);
    assert!(!cold.is_empty);
    // The curated pick always leads.
    assert_eq!(cold.entries[0].name, "Anthem of Squirrels");
    assert!(cold.entries[0].reasons.iter().any(|r| r == "curated"));

    let warm = engine.get_theme_preview(&query).await.unwrap();
    assert_eq!(cold.entries, warm.entries);
    assert_eq!(cold.seed, warm.seed);

    let snapshot = engine.preview_metrics();
    assert_eq!(snapshot.counters.requests, 2);
    assert_eq!(snapshot.counters.misses, 1);
    assert_eq!(snapshot.counters.hits, 1);
    assert!((snapshot.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_distinct_queries_get_distinct_cache_entries() {
    let engine = fixture_engine(PreviewConfig::default()).await;

    engine
        .get_theme_preview(&PreviewQuery::new("tokens").with_limit(3))
        .await
        .unwrap();
    engine
        .get_theme_preview(&PreviewQuery::new("tokens").with_limit(6))
        .await
        .unwrap();
    engine
        .get_theme_preview(&PreviewQuery::new("lifegain").with_limit(3))
        .await
        .unwrap();

    let snapshot = engine.preview_metrics();
    assert_eq!(snapshot.counters.misses, 3);
    assert_eq!(snapshot.counters.hits, 0);
}

// =============================================================================
// Commander scoping
// =============================================================================

#[tokio::test]
async fn test_commander_overlap_surfaces_in_reasons() {
    let engine = fixture_engine(PreviewConfig::default()).await;
    let query = PreviewQuery::new("tokens")
        .with_commander("Chatterfang, Squirrel General")
        .with_limit(6);

    let payload = engine.get_theme_preview(&query).await.unwrap();
    let herald = payload
        .entries
        .iter()
        .find(|entry| entry.name == "Squirrel Herald")
        .expect("overlapping card should be sampled from a 6-card pool");
    assert!(herald
        .reasons
        .iter()
        .any(|r| r.starts_with("commander-overlap:")));
}

#[tokio::test]
async fn test_commander_and_commanderless_previews_cached_separately() {
    let engine = fixture_engine(PreviewConfig::default()).await;
    let plain = PreviewQuery::new("tokens").with_limit(4);
    let scoped = plain
        .clone()
        .with_commander("Chatterfang, Squirrel General");
    assert_ne!(plain.cache_key(), scoped.cache_key());

    engine.get_theme_preview(&plain).await.unwrap();
    engine.get_theme_preview(&scoped).await.unwrap();
    assert_eq!(engine.preview_metrics().counters.misses, 2);
}

// =============================================================================
// Cache pressure
// =============================================================================

#[tokio::test]
async fn test_burst_of_unique_queries_triggers_overflow_sweep() {
    init_logging();
    let mut config = PreviewConfig::default();
    config.cache.capacity = 2;
    config.cache.overflow_factor = 2.0;
    // Debounce longer than the test so scored passes stay suppressed and
    // the burst has to be handled by the emergency sweep.
    config.cache.eviction_debounce_ms = 60_000;

    let engine = fixture_engine(config).await;
    for limit in 1..=8 {
        engine
            .get_theme_preview(&PreviewQuery::new("tokens").with_limit(limit))
            .await
            .unwrap();
    }

    let snapshot = engine.preview_metrics();
    assert!(snapshot.counters.evictions_overflow > 0);
    assert!(engine.cache().len().await <= 4);
}

#[tokio::test]
async fn test_bust_then_rebuild_round_trip() {
    let engine = fixture_engine(PreviewConfig::default()).await;
    let query = PreviewQuery::new("tokens").with_limit(4);

    engine.get_theme_preview(&query).await.unwrap();
    assert_eq!(engine.bust_preview_cache(Some("tokens")).await, 1);
    assert_eq!(engine.preview_metrics().counters.invalidations, 1);

    engine.get_theme_preview(&query).await.unwrap();
    assert_eq!(engine.preview_metrics().counters.misses, 2);
}

// =============================================================================
// Background refresh
// =============================================================================

#[tokio::test]
async fn test_refresher_tick_keeps_hot_theme_warm() {
    init_logging();
    let engine = fixture_engine(PreviewConfig::default()).await;
    let query = PreviewQuery::new("tokens").with_limit(4);
    engine.get_theme_preview(&query).await.unwrap();

    let mut settings = engine.config().refresh.clone();
    // Treat everything as near-expiry so the tick has work to do.
    settings.expiry_window_secs = 3600;
    let refreshed = refresh::run_tick(&engine, &settings).await;
    assert_eq!(refreshed, 1);

    // The refreshed entry serves the next request from cache.
    engine.get_theme_preview(&query).await.unwrap();
    let snapshot = engine.preview_metrics();
    assert_eq!(snapshot.counters.refreshes, 1);
    assert_eq!(snapshot.counters.hits, 1);
}

#[tokio::test]
async fn test_refresher_lifecycle() {
    let engine = fixture_engine(PreviewConfig::default()).await;
    let refresher = BackgroundRefresher::spawn(engine).expect("enabled by default");
    refresher.shutdown().await;
}

// =============================================================================
// Catalog reloads
// =============================================================================

#[tokio::test]
async fn test_catalog_file_to_served_preview() {
    let rows = fixture_rows();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&rows).unwrap().as_bytes())
        .unwrap();

    let loaded = load_catalog_file(file.path()).unwrap();
    assert_eq!(loaded.len(), rows.len());

    let index = Arc::new(CardIndex::new());
    let diagnostics = index.build_from_rows(loaded, false).await.unwrap();
    assert_eq!(diagnostics.skipped_rows, 0);

    let engine = PreviewEngine::new(index, PreviewConfig::default());
    let payload = engine
        .get_theme_preview(&PreviewQuery::new("tokens").with_limit(4))
        .await
        .unwrap();
    assert_eq!(payload.entries.len(), 4);
}

#[tokio::test]
async fn test_reload_invalidates_previews() {
    let engine = fixture_engine(PreviewConfig::default()).await;
    let query = PreviewQuery::new("lifegain").with_limit(1);
    engine.get_theme_preview(&query).await.unwrap();

    // Reload with a catalog where the theme has a different sole member.
    let replacement = vec![card("Soul Warden", "common", 1.0, &["lifegain"])];
    engine.rebuild_index(replacement, true).await.unwrap();

    let payload = engine.get_theme_preview(&query).await.unwrap();
    assert_eq!(payload.entries[0].name, "Soul Warden");
}
