//! State store port.
//!
//! One writer (the decision loop) saves whole snapshots; the snapshot is read
//! once at startup.

use crate::error::StoreError;
use crate::snapshot::PersistedState;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Durable storage for `PersistedState`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Replace the stored snapshot.
    async fn save(&self, state: &PersistedState) -> Result<(), StoreError>;

    /// Read the stored snapshot as-is.
    async fn load(&self) -> Result<Option<PersistedState>, StoreError>;

    /// Read the stored snapshot, treating one older than `max_age` as absent.
    async fn load_fresh(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Result<Option<PersistedState>, StoreError> {
        match self.load().await? {
            Some(state) if state.is_stale(now, max_age) => {
                warn!(
                    saved_at = %state.timestamp,
                    max_age_hours = max_age.num_hours(),
                    "Persisted state is stale, ignoring"
                );
                Ok(None)
            }
            other => Ok(other),
        }
    }
}
