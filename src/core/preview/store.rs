//! Optional write-through secondary store behind the in-memory cache.
//!
//! Purely a best-effort secondary lookup on local miss: the in-memory cache
//! is always the source of truth, and secondary failures are logged at
//! debug and otherwise ignored. There is no cross-process coherence
//! contract.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::PreviewPayload;

/// Backend for best-effort shared preview storage (implemented by e.g. a
/// Redis adapter in the web layer).
#[async_trait::async_trait]
pub trait SecondaryStore: Send + Sync {
    /// Fetch a previously stored payload by cache key.
    async fn load(&self, key: &str) -> Result<Option<PreviewPayload>, String>;

    /// Store a payload under its cache key.
    async fn store(&self, key: &str, payload: &PreviewPayload) -> Result<(), String>;
}

// ============================================================================
// InMemoryStore
// ============================================================================

/// Trivial in-process implementation, mainly for tests and demos.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Arc<PreviewPayload>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl SecondaryStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<PreviewPayload>, String> {
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|payload| (**payload).clone()))
    }

    async fn store(&self, key: &str, payload: &PreviewPayload) -> Result<(), String> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), Arc::new(payload.clone()));
        Ok(())
    }
}

/// A store that always fails; exercises the silent-failure contract.
#[cfg(test)]
pub struct FailingStore;

#[cfg(test)]
#[async_trait::async_trait]
impl SecondaryStore for FailingStore {
    async fn load(&self, _key: &str) -> Result<Option<PreviewPayload>, String> {
        Err("secondary backend unavailable".to_string())
    }

    async fn store(&self, _key: &str, _payload: &PreviewPayload) -> Result<(), String> {
        Err("secondary backend unavailable".to_string())
    }
}
