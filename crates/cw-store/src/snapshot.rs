use std::sync::Arc;

use cw_types::Snapshot;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, DurableStore};

/// Name under which a world's ledger snapshot is stored.
pub const SNAPSHOT_DATA_NAME: &str = "cloud_warehouse_state";

/// Reads and writes ledger snapshots as JSON documents in a [`DurableStore`].
///
/// Each world gets one document at `<world>/cloud_warehouse_state`.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn DurableStore>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn DurableStore>) -> Self {
        Self { backend }
    }

    /// Storage key for `world`'s snapshot.
    pub fn key_for(world: &str) -> StoreResult<String> {
        validate_key(world)?;
        Ok(format!("{world}/{SNAPSHOT_DATA_NAME}"))
    }

    /// Load `world`'s snapshot, or `None` if it has never been saved.
    pub fn load(&self, world: &str) -> StoreResult<Option<Snapshot>> {
        let key = Self::key_for(world)?;
        let Some(bytes) = self.backend.read(&key)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, world: &str, snapshot: &Snapshot) -> StoreResult<()> {
        let key = Self::key_for(world)?;
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.backend.write(&key, &bytes)?;
        debug!(world, types = snapshot.type_count(), "snapshot saved");
        Ok(())
    }

    /// Worlds that have a saved snapshot.
    pub fn worlds(&self) -> StoreResult<Vec<String>> {
        let suffix = format!("/{SNAPSHOT_DATA_NAME}");
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_suffix(&suffix).map(str::to_string))
            .collect())
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}
