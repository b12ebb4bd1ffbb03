//! Network front of the Cloud Warehouse.
//!
//! Hosts one world's authority behind a framed TCP protocol listener,
//! exposes read-only HTTP endpoints, and drives the periodic save cycle.
//! [`RemoteTransport`] is the matching viewer-side client.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use client::RemoteTransport;
pub use config::{ServerConfig, StarterStack};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::{RunningServer, WarehouseServer};
