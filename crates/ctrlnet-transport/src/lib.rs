//! Socket transports for control-system links.
//!
//! Provides a unified interface over the two transports a link can run on:
//! - UDP sockets, where every receive yields one complete message
//! - TCP streams, where messages must be re-assembled from a byte stream
//!
//! This is the lowest layer of ctrlnet. Everything else builds on top of
//! the [`Transport`] trait provided here.

pub mod error;
pub mod tcp;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use tcp::{TcpLineListener, TcpTransport};
pub use traits::{is_poll_tick, Transport, TransportKind};
pub use udp::UdpTransport;
