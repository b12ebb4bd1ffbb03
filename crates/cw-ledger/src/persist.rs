use cw_store::SnapshotStore;
use cw_types::Timestamp;
use tracing::info;

use crate::error::LedgerResult;
use crate::ledger::Ledger;

/// Load `world`'s ledger, or create an empty one stamped with the current
/// time if nothing has been saved yet.
pub fn load_or_create(store: &SnapshotStore, world: &str) -> LedgerResult<Ledger> {
    match store.load(world)? {
        Some(snapshot) => {
            info!(
                world,
                types = snapshot.type_count(),
                last_updated = snapshot.last_updated().as_millis(),
                "warehouse loaded"
            );
            Ok(Ledger::from_snapshot(snapshot))
        }
        None => {
            info!(world, "no saved warehouse; starting empty");
            Ok(Ledger::new(Timestamp::now()))
        }
    }
}

impl Ledger {
    /// Persist the ledger if it changed since the last save.
    ///
    /// Returns whether anything was written.
    pub fn save(&mut self, store: &SnapshotStore, world: &str) -> LedgerResult<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        store.save(world, &self.snapshot())?;
        self.mark_clean();
        Ok(true)
    }

    /// Persist the ledger unconditionally.
    pub fn save_now(&mut self, store: &SnapshotStore, world: &str) -> LedgerResult<()> {
        store.save(world, &self.snapshot())?;
        self.mark_clean();
        Ok(())
    }
}
