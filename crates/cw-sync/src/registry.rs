use std::collections::HashMap;
use std::sync::Arc;

use cw_ledger::load_or_create;
use cw_store::SnapshotStore;
use cw_types::ResourceCatalog;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::authority::{Authority, AuthorityHandle};
use crate::error::SyncResult;
use crate::types::AuthorityConfig;

/// One running authority per world, started on first access.
pub struct WorldRegistry {
    store: SnapshotStore,
    catalog: Arc<dyn ResourceCatalog>,
    config: AuthorityConfig,
    worlds: Mutex<HashMap<String, AuthorityHandle>>,
}

impl WorldRegistry {
    pub fn new(store: SnapshotStore, catalog: Arc<dyn ResourceCatalog>, config: AuthorityConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            worlds: Mutex::new(HashMap::new()),
        }
    }

    /// Handle for `world`, loading its ledger and starting its authority if
    /// this is the first access.
    pub async fn get_or_load(&self, world: &str) -> SyncResult<AuthorityHandle> {
        let mut worlds = self.worlds.lock().await;
        if let Some(handle) = worlds.get(world) {
            return Ok(handle.clone());
        }
        let ledger = load_or_create(&self.store, world)?;
        let handle = Authority::new(
            world,
            ledger,
            Arc::clone(&self.catalog),
            Some(self.store.clone()),
            self.config.clone(),
        )
        .spawn();
        worlds.insert(world.to_string(), handle.clone());
        Ok(handle)
    }

    /// Save every world whose ledger changed. Returns how many were written.
    ///
    /// A failing world is logged and skipped; the first error is returned
    /// after the others have been attempted.
    pub async fn save_all(&self) -> SyncResult<usize> {
        let handles: Vec<AuthorityHandle> = self.worlds.lock().await.values().cloned().collect();
        let mut written = 0;
        let mut first_error = None;
        for handle in handles {
            match handle.save().await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(world = handle.world(), error = %e, "save failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if written > 0 {
            info!(worlds = written, "warehouses saved");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Names of the loaded worlds, sorted.
    pub async fn worlds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.worlds.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}
