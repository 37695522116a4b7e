//! The preview engine facade.
//!
//! Single entry point wiring the card index, sampler, cache, metrics, and
//! optional secondary store together. The background refresher and the web
//! layer both go through this type, so all cache mutation funnels through
//! one lock-guarded path.

use std::sync::Arc;
use std::time::Instant;

use super::cache::PreviewCache;
use super::error::Result;
use super::metrics::{MetricsSnapshot, PreviewMetrics};
use super::sampler::sample_preview;
use super::store::SecondaryStore;
use super::types::{PreviewPayload, PreviewQuery};
use crate::config::PreviewConfig;
use crate::core::catalog::{BuildDiagnostics, CardIndex, RawCardRow};

// ============================================================================
// PreviewEngine
// ============================================================================

/// Facade over the theme preview subsystem.
///
/// The card index is an injected dependency, not a global; construct one
/// engine per process (or per test) and share it via `Arc`.
pub struct PreviewEngine {
    index: Arc<CardIndex>,
    cache: PreviewCache,
    metrics: Arc<PreviewMetrics>,
    config: Arc<PreviewConfig>,
    secondary: Option<Arc<dyn SecondaryStore>>,
}

impl PreviewEngine {
    pub fn new(index: Arc<CardIndex>, config: PreviewConfig) -> Self {
        let metrics = Arc::new(PreviewMetrics::new());
        let cache = PreviewCache::new(
            config.cache.clone(),
            config.eviction.clone(),
            config.ttl.clone(),
            metrics.clone(),
        );
        Self {
            index,
            cache,
            metrics,
            config: Arc::new(config),
            secondary: None,
        }
    }

    /// Attach a best-effort secondary store consulted on local misses.
    pub fn with_secondary(mut self, secondary: Arc<dyn SecondaryStore>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn metrics(&self) -> &Arc<PreviewMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &Arc<PreviewConfig> {
        &self.config
    }

    pub(crate) fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// The single preview entry point: cache lookup, then on miss index
    /// lookup + scoring + cache store.
    ///
    /// Degenerate inputs (unknown theme or commander, zero limit) yield a
    /// valid empty or clamped payload. The only error is consulting the
    /// engine before the first index build.
    pub async fn get_theme_preview(&self, query: &PreviewQuery) -> Result<Arc<PreviewPayload>> {
        let snapshot = self.index.snapshot().await?;
        self.metrics.record_request(&query.theme);

        let key = query.cache_key();
        if let Some(payload) = self.cache.get(&key).await {
            self.metrics.record_hit(&query.theme);
            return Ok(payload);
        }
        self.metrics.record_miss(&query.theme);

        // Best-effort secondary lookup; failures are not our problem.
        if let Some(secondary) = &self.secondary {
            match secondary.load(&key).await {
                Ok(Some(payload)) => {
                    self.metrics.record_secondary_hit();
                    let payload = Arc::new(payload);
                    self.cache.put(query, payload.clone(), payload.build_ms).await;
                    return Ok(payload);
                }
                Ok(None) => {}
                Err(e) => log::debug!("Secondary store load failed for {key}: {e}"),
            }
        }

        let started = Instant::now();
        let payload = Arc::new(sample_preview(&snapshot, query, &self.config.sampler));
        let build_cost_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.metrics.record_build(
            &query.theme,
            build_cost_ms,
            payload.curated_count,
            payload.sampled_count,
            payload.synthetic_count,
        );
        self.cache.put(query, payload.clone(), build_cost_ms).await;

        if let Some(secondary) = &self.secondary {
            if let Err(e) = secondary.store(&key, &payload).await {
                log::debug!("Secondary store write failed for {key}: {e}");
            }
        }

        Ok(payload)
    }

    /// Rebuild a preview through the miss-path, bypassing the cache
    /// lookup. This is the refresher's trigger; the logic is identical to
    /// an on-demand miss.
    pub async fn rebuild_preview(&self, query: &PreviewQuery) -> Result<Arc<PreviewPayload>> {
        let snapshot = self.index.snapshot().await?;

        let started = Instant::now();
        let payload = Arc::new(sample_preview(&snapshot, query, &self.config.sampler));
        let build_cost_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.metrics.record_build(
            &query.theme,
            build_cost_ms,
            payload.curated_count,
            payload.sampled_count,
            payload.synthetic_count,
        );
        self.cache.put(query, payload.clone(), build_cost_ms).await;

        if let Some(secondary) = &self.secondary {
            let key = query.cache_key();
            if let Err(e) = secondary.store(&key, &payload).await {
                log::debug!("Secondary store write failed for {key}: {e}");
            }
        }

        Ok(payload)
    }

    /// Invalidate one theme's previews, or everything.
    pub async fn bust_preview_cache(&self, theme: Option<&str>) -> usize {
        self.cache.invalidate(theme).await
    }

    /// Snapshot of counters and percentiles for observability.
    pub fn preview_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// (Re)build the card index and bust the cache when a new snapshot was
    /// published.
    pub async fn rebuild_index(
        &self,
        rows: Vec<RawCardRow>,
        force_reload: bool,
    ) -> Option<BuildDiagnostics> {
        let diagnostics = self.index.build_from_rows(rows, force_reload).await;
        if diagnostics.is_some() {
            // Cached payloads were built against the prior snapshot.
            self.bust_preview_cache(None).await;
        }
        diagnostics
    }
}

// ============================================================================
// Tests
// ============================================================================
