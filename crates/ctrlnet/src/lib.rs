//! Asynchronous control-system message links over UDP and TCP.
//!
//! ctrlnet exchanges short discrete messages with one remote peer: a link
//! owns the socket, runs a continuous receive loop, buffers inbound
//! messages in a bounded FIFO mailbox and hands them to the consumer on
//! request.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP datagram and TCP stream transports
//! - [`frame`]: CR LF line framing for stream transports
//! - [`link`]: The link, its mailbox and data-arrived notifications
//! - [`command`]: Command vocabulary and dispatch (behind `command` feature)

/// Re-export transport types.
pub mod transport {
    pub use ctrlnet_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ctrlnet_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use ctrlnet_link::*;
}

/// Re-export command types (requires `command` feature).
#[cfg(feature = "command")]
pub mod command {
    pub use ctrlnet_command::*;
}
