use cw_types::{ResourceType, Snapshot, Timestamp};
use tracing::debug;

/// A viewer's read-only mirror of the last snapshot it was pushed.
///
/// Writes only happen through [`apply`](Self::apply). A push stamped
/// earlier than the held snapshot is ignored, so the cache never moves
/// backwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteCache {
    snapshot: Option<Snapshot>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held snapshot wholesale. Returns `false` for a stale push.
    pub fn apply(&mut self, snapshot: Snapshot) -> bool {
        if let Some(current) = &self.snapshot {
            if current.last_updated().is_after(&snapshot.last_updated()) {
                debug!(
                    held = current.last_updated().as_millis(),
                    pushed = snapshot.last_updated().as_millis(),
                    "ignoring stale snapshot"
                );
                return false;
            }
        }
        self.snapshot = Some(snapshot);
        true
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn quantity(&self, resource: &ResourceType) -> u64 {
        self.snapshot.as_ref().map_or(0, |s| s.quantity(resource))
    }

    pub fn type_count(&self) -> usize {
        self.snapshot.as_ref().map_or(0, Snapshot::type_count)
    }

    /// `None` until the first push arrives.
    pub fn last_updated(&self) -> Option<Timestamp> {
        self.snapshot.as_ref().map(Snapshot::last_updated)
    }
}
