//! Bidirectional message link with a bounded inbound mailbox.
//!
//! A [`Link`] owns one transport, runs a continuous receive loop on a worker
//! thread, and queues completed messages in a FIFO [`Mailbox`]. Consumers
//! are told that data arrived through [`Notifications`] and fetch the
//! payload with [`Link::pop`]. Transport faults never cross the consumer
//! boundary; they are recorded and exposed through [`Link::error`].

pub mod config;
pub mod error;
pub mod link;
pub mod mailbox;
pub mod signal;

pub use config::{LinkConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RECV_BUFFER_SIZE, MAX_DATA_SIZE};
pub use error::{Direction, LinkError, LinkFault, Result};
pub use link::{Framing, Link};
pub use mailbox::Mailbox;
pub use signal::Notifications;
