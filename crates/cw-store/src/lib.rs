//! Durable storage for Cloud Warehouse ledger snapshots.
//!
//! The host's world storage is modelled as an opaque key-value blob store:
//! the warehouse hands it bytes under a key and reads them back later, and
//! never relies on anything else about it.
//!
//! # Storage Backends
//!
//! All backends implement the [`DurableStore`] trait:
//!
//! - [`InMemoryDurableStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileDurableStore`] -- one file per key under a data directory
//!
//! [`SnapshotStore`] layers the snapshot document format on top of any
//! backend.
//!
//! # Design Rules
//!
//! 1. Writes replace the previous value for a key as a whole.
//! 2. File writes go to a temporary file first and are renamed into place.
//! 3. The store never interprets the bytes it holds.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileDurableStore;
pub use memory::InMemoryDurableStore;
pub use snapshot::{SnapshotStore, SNAPSHOT_DATA_NAME};
pub use traits::{validate_key, DurableStore};
