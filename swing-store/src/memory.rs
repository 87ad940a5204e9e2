//! In-memory store implementation
//!
//! Used for testing and development without touching the filesystem.

use crate::error::StoreError;
use crate::repository::StateStore;
use crate::snapshot::PersistedState;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory store for testing
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<PersistedState>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state`
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of saves performed
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current snapshot, if any
    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drop the stored snapshot (simulates a deleted state file)
    pub fn clear(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let state = PersistedState {
            timestamp: Utc::now(),
            ..PersistedState::default()
        };
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(state));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_load_fresh_rejects_stale() {
        let now = Utc::now();
        let store = MemoryStore::with_state(PersistedState {
            timestamp: now - Duration::hours(72),
            ..PersistedState::default()
        });

        assert!(store.load_fresh(now, Duration::hours(48)).await.unwrap().is_none());
        assert!(store.load().await.unwrap().is_some());
    }
}
