//! Background refresher keeping hot previews warm.
//!
//! A single long-lived task ranks themes by request frequency and rebuilds
//! cached entries shortly before their TTL expires, turning user-facing
//! cold misses into invisible background rebuilds. It drives the same
//! engine entry points as any other caller (no private cache access) and
//! is disable-able via config without affecting the on-demand path.
//!
//! The polling interval adapts: elevated build p95 or refresh failure rate
//! halves it (recover faster), a healthy system lengthens it (less
//! overhead), clamped to configured bounds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::engine::PreviewEngine;
use crate::config::RefreshSettings;

// ============================================================================
// BackgroundRefresher
// ============================================================================

/// Handle to the spawned refresher task.
pub struct BackgroundRefresher {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundRefresher {
    /// Spawn the refresher loop, or return `None` when disabled in config.
    pub fn spawn(engine: Arc<PreviewEngine>) -> Option<Self> {
        let settings = engine.config().refresh.clone();
        if !settings.enabled {
            log::info!("Background refresher disabled by config");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(engine, settings, shutdown_rx));
        Some(Self {
            shutdown_tx,
            handle,
        })
    }

    /// Signal shutdown and wait for the current iteration to complete.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

// ============================================================================
// Worker loop
// ============================================================================

async fn run_loop(
    engine: Arc<PreviewEngine>,
    settings: RefreshSettings,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = clamp_interval(
        Duration::from_secs(settings.initial_interval_secs),
        &settings,
    );
    log::info!(
        "Background refresher started (interval {}s)",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    log::info!("Background refresher shutting down");
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {
                let refreshed = run_tick(&engine, &settings).await;
                if refreshed > 0 {
                    log::debug!("Refreshed {refreshed} preview entries");
                }
                interval = next_interval(
                    interval,
                    engine.metrics().recent_build_p95(),
                    engine.metrics().refresh_failure_rate(),
                    &settings,
                );
            }
        }
    }
}

/// One refresher iteration: rebuild near-expiry entries for the hottest
/// themes through the public miss-path.
pub(crate) async fn run_tick(engine: &PreviewEngine, settings: &RefreshSettings) -> usize {
    let hot = engine.metrics().hot_themes(settings.top_themes);
    if hot.is_empty() {
        return 0;
    }

    let window = Duration::from_secs(settings.expiry_window_secs);
    let due = engine.cache().keys_near_expiry(window).await;

    let mut refreshed = 0;
    for query in due {
        if !hot.contains(&query.theme) {
            continue;
        }
        match engine.rebuild_preview(&query).await {
            Ok(_) => {
                engine.metrics().record_refresh(true);
                refreshed += 1;
            }
            Err(e) => {
                engine.metrics().record_refresh(false);
                log::warn!("Background refresh failed for '{}': {e}", query.theme);
            }
        }
    }
    refreshed
}

/// Adapt the polling interval from observed health.
pub(crate) fn next_interval(
    current: Duration,
    build_p95_ms: Option<f64>,
    refresh_failure_rate: f64,
    settings: &RefreshSettings,
) -> Duration {
    let unhealthy =
        build_p95_ms.map_or(false, |p95| p95 > settings.p95_threshold_ms) || refresh_failure_rate > 0.1;
    let proposed = if unhealthy {
        current / 2
    } else {
        current.saturating_add(current / 2)
    };
    clamp_interval(proposed, settings)
}

fn clamp_interval(interval: Duration, settings: &RefreshSettings) -> Duration {
    interval.clamp(
        Duration::from_secs(settings.min_interval_secs),
        Duration::from_secs(settings.max_interval_secs),
    )
}

// ============================================================================
// Tests
// ============================================================================
