//! User-facing text for operation outcomes and warehouse listings.

use std::collections::BTreeMap;

use cw_types::{OperationKind, OperationResult, ResourceCatalog, ResourceType, Snapshot};

/// Shown instead of a listing when nothing is in stock.
pub const EMPTY_WAREHOUSE: &str = "The warehouse is currently empty.";

/// Header line of a full listing.
pub const LISTING_HEADER: &str = "--- Cloud Warehouse ---";

/// Sentence describing the outcome of one operation.
pub fn describe_outcome<C>(
    op: OperationKind,
    result: OperationResult,
    moved: &BTreeMap<ResourceType, u64>,
    catalog: &C,
) -> String
where
    C: ResourceCatalog + ?Sized,
{
    match result {
        OperationResult::Success => describe_success(op, moved, catalog),
        OperationResult::NotStackable => {
            "This item does not stack and cannot be stored in the cloud warehouse!".into()
        }
        OperationResult::NotSimple => "This item carries special data (such as damage or \
             enchantments) and cannot be stored in the cloud warehouse!"
            .into(),
        OperationResult::InsufficientStock => "Insufficient stock!".into(),
        OperationResult::NotInInventory => {
            "You do not have enough plain items of this kind!".into()
        }
    }
}

fn describe_success<C>(op: OperationKind, moved: &BTreeMap<ResourceType, u64>, catalog: &C) -> String
where
    C: ResourceCatalog + ?Sized,
{
    let parts = moved
        .iter()
        .map(|(resource, count)| format!("{count} x {}", catalog.display_name(resource)))
        .collect::<Vec<_>>()
        .join(", ");
    match op {
        OperationKind::DepositAll if moved.is_empty() => "Nothing to store.".into(),
        OperationKind::DepositAll => {
            let total: u64 = moved.values().sum();
            format!("Stored {total} items: {parts}")
        }
        OperationKind::DepositByType | OperationKind::DepositFromSlot => {
            format!("Deposited {parts}")
        }
        OperationKind::WithdrawByType => format!("Withdrew {parts}"),
    }
}

/// Answer to a single-type stock query.
pub fn describe_stock<C>(resource: &ResourceType, quantity: u64, catalog: &C) -> String
where
    C: ResourceCatalog + ?Sized,
{
    format!("Stock of {}: {quantity}", catalog.display_name(resource))
}

/// One line per stocked type, ordered by resource identifier, preceded by
/// [`LISTING_HEADER`]; a single [`EMPTY_WAREHOUSE`] line when nothing is
/// stocked.
pub fn listing_lines<C>(snapshot: &Snapshot, catalog: &C) -> Vec<String>
where
    C: ResourceCatalog + ?Sized,
{
    if snapshot.is_empty() {
        return vec![EMPTY_WAREHOUSE.to_string()];
    }
    std::iter::once(LISTING_HEADER.to_string())
        .chain(
            snapshot
                .stocked()
                .map(|(resource, quantity)| format!("- {}: {quantity}", catalog.display_name(resource))),
        )
        .collect()
}
