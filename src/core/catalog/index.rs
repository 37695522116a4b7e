//! Card index with atomic snapshot rebuilds.
//!
//! The index normalizes the raw card dump once into a [`CatalogSnapshot`]:
//! O(1) case-insensitive name lookup plus precomputed per-theme membership
//! and curated lists. Readers clone the snapshot `Arc` and never observe a
//! partially built index; a rebuild swaps the snapshot wholesale (callers
//! are expected to bust the preview cache afterwards).
//!
//! # Thread Safety
//!
//! The snapshot pointer is protected by `tokio::sync::RwLock`; the snapshot
//! contents are immutable once published.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::types::{
    normalize_name, normalize_theme, pip_multiset, normalize_colors, CardRecord, RawCardRow,
    Rarity,
};
use crate::core::preview::error::{PreviewError, Result};

// ============================================================================
// BuildDiagnostics
// ============================================================================

/// Per-build diagnostics surfaced to callers and logs.
///
/// Malformed rows are skipped or defaulted, never fatal; these counts are
/// the only trace they leave.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    /// Rows dropped entirely (blank name).
    pub skipped_rows: usize,
    /// Rows that loaded with a defaulted rarity or mana value.
    pub defaulted_fields: usize,
    /// Later printings that replaced an earlier record (last-write-wins).
    pub duplicate_names: usize,
    pub cards: usize,
    pub themes: usize,
    pub build_ms: f64,
}

// ============================================================================
// CatalogSnapshot
// ============================================================================

/// One immutable build of the card index.
#[derive(Debug)]
pub struct CatalogSnapshot {
    /// Case-insensitive name -> record.
    by_name: HashMap<String, Arc<CardRecord>>,

    /// Theme -> membership list in source insertion order. The stable
    /// ordering is what makes seeded shuffles reproducible per snapshot.
    themes: IndexMap<String, Vec<Arc<CardRecord>>>,

    /// Theme -> curated (pinned) cards, also in source order.
    curated: HashMap<String, Vec<Arc<CardRecord>>>,

    diagnostics: BuildDiagnostics,
}

impl CatalogSnapshot {
    /// Case-insensitive lookup. Absent cards are an expected condition,
    /// not a fault.
    pub fn lookup_by_name(&self, name: &str) -> Option<&Arc<CardRecord>> {
        self.by_name.get(&normalize_name(name))
    }

    /// Precomputed membership list for `theme`, empty for unknown themes.
    pub fn cards_for_theme(&self, theme: &str) -> &[Arc<CardRecord>] {
        self.themes
            .get(&normalize_theme(theme))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Curated cards pinned for `theme`, empty when none are pinned.
    pub fn curated_for_theme(&self, theme: &str) -> &[Arc<CardRecord>] {
        self.curated
            .get(&normalize_theme(theme))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All known theme names, in source order.
    pub fn themes(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn diagnostics(&self) -> &BuildDiagnostics {
        &self.diagnostics
    }

    pub fn card_count(&self) -> usize {
        self.by_name.len()
    }
}

// ============================================================================
// CardIndex
// ============================================================================

/// The injectable card index handle.
///
/// Constructed unbuilt; [`CardIndex::build_from_rows`] publishes the first
/// snapshot. Consulting the engine before the first successful build is a
/// wiring bug and fails fast with [`PreviewError::IndexNotBuilt`].
#[derive(Default)]
pub struct CardIndex {
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot has ever been published.
    pub async fn is_built(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// Current snapshot, or `IndexNotBuilt` when no build has happened.
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
        self.snapshot
            .read()
            .await
            .clone()
            .ok_or(PreviewError::IndexNotBuilt)
    }

    /// (Re)build the index from raw rows.
    ///
    /// No-op when already built unless `force_reload`. Returns the
    /// diagnostics of the published snapshot, or `None` when the call was a
    /// no-op. Callers owning a preview cache must bust it after a rebuild.
    pub async fn build_from_rows(
        &self,
        rows: Vec<RawCardRow>,
        force_reload: bool,
    ) -> Option<BuildDiagnostics> {
        if !force_reload && self.is_built().await {
            log::debug!("Card index already built; skipping rebuild");
            return None;
        }

        let snapshot = Arc::new(build_snapshot(rows));
        let diagnostics = snapshot.diagnostics().clone();
        log::info!(
            "Card index built: {} cards, {} themes, {} skipped rows, {} defaulted fields ({:.1}ms)",
            diagnostics.cards,
            diagnostics.themes,
            diagnostics.skipped_rows,
            diagnostics.defaulted_fields,
            diagnostics.build_ms,
        );

        // Single-writer swap: readers see the old or the new snapshot,
        // never a partial one.
        *self.snapshot.write().await = Some(snapshot);
        Some(diagnostics)
    }

    /// Convenience: case-insensitive lookup through the current snapshot.
    pub async fn lookup_by_name(&self, name: &str) -> Result<Option<Arc<CardRecord>>> {
        Ok(self.snapshot().await?.lookup_by_name(name).cloned())
    }

    /// Convenience: membership list for `theme` (cloned handles).
    pub async fn cards_for_theme(&self, theme: &str) -> Result<Vec<Arc<CardRecord>>> {
        Ok(self.snapshot().await?.cards_for_theme(theme).to_vec())
    }
}

// ============================================================================
// Snapshot construction
// ============================================================================

pub(crate) fn build_snapshot(rows: Vec<RawCardRow>) -> CatalogSnapshot {
    let started = Instant::now();
    let mut diagnostics = BuildDiagnostics::default();

    // Last-write-wins across duplicate printings, preserving first-seen
    // position so membership order stays stable.
    let mut records: IndexMap<String, Arc<CardRecord>> = IndexMap::new();

    for row in rows {
        let name = row.name.trim().to_string();
        if name.is_empty() {
            diagnostics.skipped_rows += 1;
            continue;
        }

        let mana_value = match row.mana_value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(_) => {
                diagnostics.defaulted_fields += 1;
                0.0
            }
            None => 0.0,
        };
        if !row.rarity.trim().is_empty()
            && Rarity::parse_lenient(&row.rarity) == Rarity::Common
            && row.rarity.trim().to_ascii_lowercase() != "common"
        {
            diagnostics.defaulted_fields += 1;
        }

        let record = Arc::new(CardRecord {
            mana_value,
            color_identity: normalize_colors(&row.color_identity),
            pip_colors: pip_multiset(&row.mana_cost),
            rarity: Rarity::parse_lenient(&row.rarity),
            mana_cost: row.mana_cost,
            type_line: row.type_line,
            theme_tags: row.theme_tags.iter().map(|t| normalize_theme(t)).collect(),
            synergy_tags: row
                .synergy_tags
                .iter()
                .map(|t| normalize_theme(t))
                .collect(),
            curated_themes: row
                .curated_themes
                .iter()
                .map(|t| normalize_theme(t))
                .collect(),
            name,
        });

        let key = normalize_name(&record.name);
        if records.insert(key, record).is_some() {
            diagnostics.duplicate_names += 1;
        }
    }

    let mut themes: IndexMap<String, Vec<Arc<CardRecord>>> = IndexMap::new();
    let mut curated: HashMap<String, Vec<Arc<CardRecord>>> = HashMap::new();
    let mut by_name: HashMap<String, Arc<CardRecord>> = HashMap::with_capacity(records.len());

    for (key, record) in records {
        for theme in &record.theme_tags {
            themes.entry(theme.clone()).or_default().push(record.clone());
        }
        for theme in &record.curated_themes {
            curated.entry(theme.clone()).or_default().push(record.clone());
        }
        by_name.insert(key, record);
    }

    diagnostics.cards = by_name.len();
    diagnostics.themes = themes.len();
    diagnostics.build_ms = started.elapsed().as_secs_f64() * 1000.0;

    CatalogSnapshot {
        by_name,
        themes,
        curated,
        diagnostics,
    }
}

// ============================================================================
// Catalog file loading
// ============================================================================

/// Load raw rows from a JSON card dump (an array of rows).
///
/// Only the rebuild path touches the filesystem; request paths never do.
pub fn load_catalog_file<P: AsRef<Path>>(path: P) -> Result<Vec<RawCardRow>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

// ============================================================================
// Tests
// ============================================================================
