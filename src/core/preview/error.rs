//! Error types for the preview engine.
//!
//! Degenerate inputs (unknown theme, unknown commander, zero limit) are
//! valid conditions handled in-band; only wiring bugs and infrastructure
//! faults surface here.

use thiserror::Error;

/// Result type alias for preview operations.
pub type Result<T> = std::result::Result<T, PreviewError>;

#[derive(Error, Debug)]
pub enum PreviewError {
    /// The engine was consulted before any card index build succeeded.
    ///
    /// This is a collaborator wiring bug and fails fast rather than
    /// silently returning empty previews.
    #[error("Card index has not been built; call build_from_rows first")]
    IndexNotBuilt,

    /// File system I/O error on the catalog load path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
