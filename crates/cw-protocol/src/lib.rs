//! Wire protocol for the Cloud Warehouse.
//!
//! Defines the message catalog exchanged between one authoritative ledger
//! and its viewers, the length-prefixed bincode framing, the boundary
//! validation that turns raw messages into [`Request`]s, and the
//! user-facing text for operation outcomes.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod feedback;
pub mod message;
pub mod request;

pub use codec::WarehouseCodec;
pub use endpoint::{endpoints, HealthResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    error_codes, Direction, WarehouseMessage, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
pub use request::Request;
