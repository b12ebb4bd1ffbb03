//! Authoritative resource ledger for the Cloud Warehouse.
//!
//! This crate is the heart of the warehouse. It provides:
//! - The [`Ledger`] mapping resource types to quantities, with its
//!   `validate`, deposit, and withdraw operations
//! - The [`SourceInventory`] boundary to the host's slot inventories, plus
//!   the [`SlotInventory`] implementation for tests and embedding
//! - Loading and saving ledgers through a [`cw_store::SnapshotStore`]
//!
//! Every mutating operation is a single atomic transition that returns an
//! [`OperationResult`](cw_types::OperationResult). A failed operation leaves
//! both the ledger and the inventory untouched. The ledger does no locking
//! of its own; callers serialize access (see `cw-sync`).

pub mod error;
pub mod inventory;
pub mod ledger;
pub mod persist;

pub use error::{LedgerError, LedgerResult};
pub use inventory::{SlotInventory, SourceInventory, PLAYER_INVENTORY_SIZE};
pub use ledger::{Deposited, Ledger};
pub use persist::load_or_create;
