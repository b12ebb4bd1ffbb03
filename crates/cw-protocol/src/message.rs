use std::collections::BTreeMap;

use cw_types::{ItemStack, OperationKind, OperationResult, ResourceType, Snapshot};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// All message types in the warehouse protocol.
///
/// Counts travel as plain integers and slot indices as `u32`; the authority
/// checks them with [`Request::from_message`](crate::Request::from_message)
/// before anything reaches the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseMessage {
    Hello { version: u32, viewer: String },
    HelloAck { version: u32, world: String },
    RequestSnapshot,
    PushSnapshot { snapshot: Snapshot },
    DepositByType { resource: ResourceType, count: u32 },
    DepositAll,
    WithdrawByType { resource: ResourceType, count: u32 },
    DepositFromSlot { slot: u32, count: u32 },
    PushInventory { slots: Vec<Option<ItemStack>> },
    OperationOutcome {
        op: OperationKind,
        result: OperationResult,
        moved: BTreeMap<ResourceType, u64>,
    },
    Error { code: u32, message: String },
}

/// Which side of a connection sends a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    ToAuthority,
    ToViewer,
}

impl WarehouseMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Hello { .. } => 1,
            Self::HelloAck { .. } => 2,
            Self::RequestSnapshot => 3,
            Self::PushSnapshot { .. } => 4,
            Self::DepositByType { .. } => 5,
            Self::DepositAll => 6,
            Self::WithdrawByType { .. } => 7,
            Self::DepositFromSlot { .. } => 8,
            Self::PushInventory { .. } => 9,
            Self::OperationOutcome { .. } => 10,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::HelloAck { .. } => "HelloAck",
            Self::RequestSnapshot => "RequestSnapshot",
            Self::PushSnapshot { .. } => "PushSnapshot",
            Self::DepositByType { .. } => "DepositByType",
            Self::DepositAll => "DepositAll",
            Self::WithdrawByType { .. } => "WithdrawByType",
            Self::DepositFromSlot { .. } => "DepositFromSlot",
            Self::PushInventory { .. } => "PushInventory",
            Self::OperationOutcome { .. } => "OperationOutcome",
            Self::Error { .. } => "Error",
        }
    }

    /// Who is allowed to send this message. `Error` flows both ways and
    /// reports `ToViewer`.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Hello { .. }
            | Self::RequestSnapshot
            | Self::DepositByType { .. }
            | Self::DepositAll
            | Self::WithdrawByType { .. }
            | Self::DepositFromSlot { .. } => Direction::ToAuthority,
            Self::HelloAck { .. }
            | Self::PushSnapshot { .. }
            | Self::PushInventory { .. }
            | Self::OperationOutcome { .. }
            | Self::Error { .. } => Direction::ToViewer,
        }
    }
}

/// Error codes carried by [`WarehouseMessage::Error`].
pub mod error_codes {
    pub const MALFORMED: u32 = 400;
    pub const UNKNOWN_RESOURCE: u32 = 404;
    pub const VERSION_MISMATCH: u32 = 426;
    pub const UNAVAILABLE: u32 = 503;
}

#[cfg(test)]
mod tests {
    use cw_types::Timestamp;

    use super::*;

    fn all() -> Vec<WarehouseMessage> {
        let wheat = ResourceType::new("minecraft:wheat").unwrap();
        vec![
            WarehouseMessage::Hello { version: 1, viewer: "alex".into() },
            WarehouseMessage::HelloAck { version: 1, world: "overworld".into() },
            WarehouseMessage::RequestSnapshot,
            WarehouseMessage::PushSnapshot { snapshot: Snapshot::empty(Timestamp::zero()) },
            WarehouseMessage::DepositByType { resource: wheat.clone(), count: 1 },
            WarehouseMessage::DepositAll,
            WarehouseMessage::WithdrawByType { resource: wheat, count: 1 },
            WarehouseMessage::DepositFromSlot { slot: 0, count: 1 },
            WarehouseMessage::PushInventory { slots: vec![] },
            WarehouseMessage::OperationOutcome {
                op: OperationKind::DepositAll,
                result: OperationResult::Success,
                moved: BTreeMap::new(),
            },
            WarehouseMessage::Error { code: 0, message: String::new() },
        ]
    }

    #[test]
    fn type_tags_unique() {
        let mut tags: Vec<u8> = all().iter().map(|m| m.type_tag()).collect();
        let len = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), len, "type tags should be unique");
    }

    #[test]
    fn type_names_correct() {
        assert_eq!(WarehouseMessage::DepositAll.type_name(), "DepositAll");
        assert_eq!(
            WarehouseMessage::Error { code: 0, message: String::new() }.type_name(),
            "Error"
        );
    }

    #[test]
    fn directions() {
        let to_authority = all()
            .iter()
            .filter(|m| m.direction() == Direction::ToAuthority)
            .count();
        assert_eq!(to_authority, 6);
        assert_eq!(
            WarehouseMessage::RequestSnapshot.direction(),
            Direction::ToAuthority
        );
    }
}
