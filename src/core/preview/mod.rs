//! Theme Preview Engine
//!
//! The preview engine produces small, deterministic samples of cards for a
//! deck-building theme and keeps the hot ones cached. It consolidates
//! sampling, scoring, adaptive caching, background refresh, and metrics
//! into a single subsystem behind [`PreviewEngine`].
//!
//! # Overview
//!
//! This module provides:
//!
//! - **Query and Payload Models**: [`PreviewQuery`], [`PreviewPayload`], [`SampledCard`]
//! - **Deterministic Sampling**: seeded shuffles plus greedy scored selection
//! - **Adaptive Caching**: composite-score eviction with hit-band TTL promotion
//! - **Background Refresh**: proactive rebuilds of hot, near-expiry entries
//! - **Metrics**: counters, build-time percentiles, and per-theme stats
//!
//! # Architecture
//!
//! ```text
//!                     +---------------------------+
//!                     |       PreviewEngine       |
//!                     |    (Facade / Entry Point) |
//!                     +---------------------------+
//!                                |
//!           +--------------------+--------------------+
//!           |                    |                    |
//!           v                    v                    v
//!   +---------------+    +---------------+    +---------------+
//!   | sample_preview|    | PreviewCache  |    | PreviewMetrics|
//!   | (scoring)     |    | (eviction/TTL)|    | (aggregation) |
//!   +---------------+    +---------------+    +---------------+
//!           |                    ^
//!           v                    |
//!   +---------------+    +---------------+
//!   | CardIndex     |    | Background    |
//!   | (catalog)     |    | Refresher     |
//!   +---------------+    +---------------+
//! ```
//!
//! # Usage Examples
//!
//! ## Serving a Preview
//!
//! ```rust,ignore
//! use themescope::core::preview::prelude::*;
//!
//! let engine = Arc::new(PreviewEngine::new(index, config));
//! let query = PreviewQuery::new("tokens")
//!     .with_commander("Rhys the Redeemed")
//!     .with_limit(12);
//! let payload = engine.get_theme_preview(&query).await?;
//! ```
//!
//! ## Running the Refresher
//!
//! ```rust,ignore
//! let refresher = BackgroundRefresher::spawn(engine.clone());
//! // ... serve traffic ...
//! if let Some(refresher) = refresher {
//!     refresher.shutdown().await;
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`error`]: Error types for all preview operations
//! - [`types`]: Query, payload, and sampled-card models
//! - [`sampler`]: Deterministic scoring and selection
//! - [`cache`]: The adaptive in-memory cache
//! - [`eviction`]: Pluggable eviction strategies
//! - [`refresh`]: The background refresher task
//! - [`metrics`]: Counters and percentile aggregation
//! - [`store`]: Optional best-effort secondary storage

// ============================================================================
// Module Declarations
// ============================================================================

pub mod cache;
pub mod engine;
pub mod error;
pub mod eviction;
pub mod metrics;
pub mod refresh;
pub mod sampler;
pub mod store;
pub mod types;

// ============================================================================
// Re-exports: Error Types
// ============================================================================

pub use error::{PreviewError, Result};

// ============================================================================
// Re-exports: Core Types
// ============================================================================

pub use types::{PreviewPayload, PreviewQuery, SampleRole, SampledCard};

// ============================================================================
// Re-exports: Engine and Refresher
// ============================================================================

pub use engine::PreviewEngine;
pub use refresh::BackgroundRefresher;

// ============================================================================
// Re-exports: Cache and Eviction
// ============================================================================

pub use cache::PreviewCache;
pub use eviction::{AgeSweep, EvictionReason, EvictionStrategy, ScoredScan};

// ============================================================================
// Re-exports: Metrics
// ============================================================================

pub use metrics::{Counters, MetricsSnapshot, PreviewMetrics, ThemeMetrics};

// ============================================================================
// Re-exports: Secondary Store
// ============================================================================

pub use store::{InMemoryStore, SecondaryStore};

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient imports for common preview operations.
///
/// ```rust,ignore
/// use themescope::core::preview::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Engine
        BackgroundRefresher,
        PreviewEngine,

        // Query and payload
        PreviewPayload,
        PreviewQuery,
        SampleRole,
        SampledCard,

        // Metrics
        MetricsSnapshot,
        PreviewMetrics,

        // Secondary store
        InMemoryStore,
        SecondaryStore,

        // Errors
        PreviewError,
        Result,
    };
}

// ============================================================================
// Module Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_via_exports() {
        let query = PreviewQuery::new("  Tokens ")
            .with_commander("Rhys the Redeemed")
            .with_limit(12);
        assert_eq!(query.theme, "tokens");
        assert_eq!(query.commander.as_deref(), Some("Rhys the Redeemed"));
        assert_eq!(query.effective_limit(), 12);
    }

    #[test]
    fn test_sample_role_exported() {
        assert_eq!(SampleRole::Payoff.as_str(), "payoff");
        assert_eq!(SampleRole::Synthetic.as_str(), "synthetic");
    }

    #[test]
    fn test_eviction_reason_exported() {
        assert_ne!(EvictionReason::LowScore, EvictionReason::EmergencyOverflow);
    }

    #[test]
    fn test_metrics_snapshot_via_exports() {
        let metrics = PreviewMetrics::new();
        metrics.record_request("tokens");
        metrics.record_miss("tokens");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counters.requests, 1);
        assert_eq!(snapshot.counters.misses, 1);
    }
}
