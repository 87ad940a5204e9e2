//! JSON file store.
//!
//! Snapshots are written to a sibling temp file, flushed, then renamed over the
//! target so a crash mid-write leaves the previous snapshot intact. A file that
//! no longer parses is moved aside to `<name>.corrupt` and reported as an error.

use crate::error::{StoreError, StoreResult};
use crate::repository::StateStore;
use crate::snapshot::PersistedState;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Single-file JSON snapshot store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    async fn write_atomic(&self, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.write_atomic(&bytes).await?;

        debug!(path = %self.path.display(), in_position = state.in_position, "State persisted");
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<PersistedState>(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                let quarantine = self.corrupt_path();
                warn!(
                    path = %self.path.display(),
                    quarantine = %quarantine.display(),
                    error = %e,
                    "State file unreadable, moving aside"
                );
                let _ = tokio::fs::rename(&self.path, &quarantine).await;
                Err(StoreError::Deserialization(e.to_string()))
            }
        }
    }
}
