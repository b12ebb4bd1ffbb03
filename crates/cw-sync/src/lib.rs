//! Synchronization for the Cloud Warehouse.
//!
//! Each world's [`Ledger`](cw_ledger::Ledger) is owned by one [`Authority`]
//! task that drains a mailbox strictly one request at a time and pushes a
//! full snapshot to every viewer's [`ViewerFeed`] after each accepted
//! mutation. Viewers hold
//! a read-only [`RemoteCache`] fed through a [`ViewerSession`]; the
//! [`WorldRegistry`] starts authorities on demand and drives the save cycle.

pub mod authority;
pub mod cache;
pub mod error;
pub mod feed;
pub mod registry;
pub mod session;
pub mod transport;
pub mod types;

pub use authority::{Authority, AuthorityHandle, BoxedInventory};
pub use cache::RemoteCache;
pub use error::{SyncError, SyncResult};
pub use feed::ViewerFeed;
pub use registry::WorldRegistry;
pub use session::{SessionEvent, ViewerSession};
pub use transport::{LocalTransport, WarehouseTransport};
pub use types::{AuthorityConfig, Outcome, ViewerId};
