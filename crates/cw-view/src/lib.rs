//! The viewer's warehouse list: a filtered, sorted, virtualized rendering
//! of a [`RemoteCache`](cw_sync::RemoteCache), plus the mapping from
//! pointer input back to [`Request`](cw_protocol::Request)s.
//!
//! Nothing here draws pixels. [`ListView::render`] produces a [`Frame`]
//! describing what a front end should draw, and [`ListView::click`] turns
//! a pointer press into the request it should send.

pub mod layout;
pub mod list;

pub use layout::{Rect, Viewport};
pub use list::{footer, Frame, ListView, Row, VisibleRow};
