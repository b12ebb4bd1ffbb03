use std::num::NonZeroU32;

use cw_types::{OperationKind, ResourceCatalog, ResourceType};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::WarehouseMessage;

/// A viewer request that passed boundary validation.
///
/// Resource types are known to the catalog and counts are positive, so the
/// ledger only ever sees well-formed input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    RequestSnapshot,
    DepositByType { resource: ResourceType, count: NonZeroU32 },
    DepositAll,
    WithdrawByType { resource: ResourceType, count: NonZeroU32 },
    DepositFromSlot { slot: usize, count: NonZeroU32 },
}

impl Request {
    /// Validate an incoming message against `catalog`.
    pub fn from_message<C>(msg: WarehouseMessage, catalog: &C) -> ProtocolResult<Self>
    where
        C: ResourceCatalog + ?Sized,
    {
        match msg {
            WarehouseMessage::RequestSnapshot => Ok(Self::RequestSnapshot),
            WarehouseMessage::DepositAll => Ok(Self::DepositAll),
            WarehouseMessage::DepositByType { resource, count } => Ok(Self::DepositByType {
                resource: known(catalog, resource)?,
                count: positive(count, "DepositByType")?,
            }),
            WarehouseMessage::WithdrawByType { resource, count } => Ok(Self::WithdrawByType {
                resource: known(catalog, resource)?,
                count: positive(count, "WithdrawByType")?,
            }),
            WarehouseMessage::DepositFromSlot { slot, count } => Ok(Self::DepositFromSlot {
                slot: slot as usize,
                count: positive(count, "DepositFromSlot")?,
            }),
            other => Err(ProtocolError::UnexpectedMessage(other.type_name())),
        }
    }

    /// The wire form of this request.
    pub fn to_message(&self) -> WarehouseMessage {
        match self {
            Self::RequestSnapshot => WarehouseMessage::RequestSnapshot,
            Self::DepositByType { resource, count } => WarehouseMessage::DepositByType {
                resource: resource.clone(),
                count: count.get(),
            },
            Self::DepositAll => WarehouseMessage::DepositAll,
            Self::WithdrawByType { resource, count } => WarehouseMessage::WithdrawByType {
                resource: resource.clone(),
                count: count.get(),
            },
            Self::DepositFromSlot { slot, count } => WarehouseMessage::DepositFromSlot {
                slot: u32::try_from(*slot).unwrap_or(u32::MAX),
                count: count.get(),
            },
        }
    }

    /// The ledger operation this request runs, if it mutates anything.
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            Self::RequestSnapshot => None,
            Self::DepositByType { .. } => Some(OperationKind::DepositByType),
            Self::DepositAll => Some(OperationKind::DepositAll),
            Self::WithdrawByType { .. } => Some(OperationKind::WithdrawByType),
            Self::DepositFromSlot { .. } => Some(OperationKind::DepositFromSlot),
        }
    }
}

fn known<C>(catalog: &C, resource: ResourceType) -> ProtocolResult<ResourceType>
where
    C: ResourceCatalog + ?Sized,
{
    if catalog.contains(&resource) {
        Ok(resource)
    } else {
        Err(ProtocolError::UnknownResource(resource))
    }
}

fn positive(count: u32, message: &'static str) -> ProtocolResult<NonZeroU32> {
    NonZeroU32::new(count).ok_or(ProtocolError::ZeroCount(message))
}
