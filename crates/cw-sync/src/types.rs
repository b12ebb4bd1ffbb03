use std::collections::BTreeMap;
use std::fmt;

use cw_protocol::WarehouseMessage;
use cw_types::{OperationKind, OperationResult, ResourceType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one joined viewer, unique per authority.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(Uuid);

impl ViewerId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewerId({})", self.0)
    }
}

/// Tuning for one world's authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Pending requests before submitters wait.
    pub mailbox_capacity: usize,
    /// Queued outcome messages per viewer before further ones are dropped.
    /// Snapshot and inventory pushes are coalesced and never dropped.
    pub viewer_channel_capacity: usize,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            viewer_channel_capacity: 256,
        }
    }
}

/// What one mutating request did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub op: OperationKind,
    pub result: OperationResult,
    /// Units moved per type; empty unless `result` is a success.
    pub moved: BTreeMap<ResourceType, u64>,
}

impl Outcome {
    pub fn to_message(&self) -> WarehouseMessage {
        WarehouseMessage::OperationOutcome {
            op: self.op,
            result: self.result,
            moved: self.moved.clone(),
        }
    }
}
