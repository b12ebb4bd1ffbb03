//! Foundation types for the Cloud Warehouse.
//!
//! This crate provides the identity, quantity, and snapshot types shared by
//! every other warehouse crate. Every other crate depends on `cw-types`.
//!
//! # Key Types
//!
//! - [`ResourceType`]: Opaque identifier of a kind of fungible resource
//! - [`ItemStack`]: One inventory slot's contents
//! - [`ResourceAttributes`]: Validation-time properties derived from the catalog
//! - [`Timestamp`]: Millisecond wall-clock stamp carried by every snapshot
//! - [`Snapshot`]: Immutable copy of the ledger, the unit of synchronization
//! - [`OperationResult`]: Outcome of every mutating ledger call
//! - [`ResourceCatalog`]: Host-supplied resource metadata

pub mod catalog;
pub mod error;
pub mod outcome;
pub mod resource;
pub mod snapshot;
pub mod temporal;

pub use catalog::{CatalogConfig, ResourceCatalog, ResourceDef, StaticCatalog};
pub use error::TypeError;
pub use outcome::{OperationKind, OperationResult};
pub use resource::{ItemStack, ResourceAttributes, ResourceType};
pub use snapshot::Snapshot;
pub use temporal::Timestamp;
