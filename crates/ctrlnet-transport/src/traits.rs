use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;

/// How a transport delimits messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Every receive yields exactly one complete message.
    Datagram,
    /// Receives yield arbitrary slices of a byte stream.
    Stream,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Datagram => "datagram",
            TransportKind::Stream => "stream",
        }
    }
}

/// A bound socket a link can drive with one receive and one send at a time.
///
/// All methods take `&self` so that the receive worker and a sender can hold
/// the same transport concurrently. Implementations must make `close`
/// release any receive that is blocked in the OS.
pub trait Transport: Send + Sync + 'static {
    /// Block until one receive completes, writing the received bytes into `buf`.
    ///
    /// `WouldBlock` and `TimedOut` mean the poll interval elapsed without a
    /// completion; see [`is_poll_tick`].
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Transmit one message to the remote endpoint.
    fn send(&self, payload: &[u8]) -> io::Result<()>;

    /// Release the underlying socket.
    fn close(&self);

    /// Bound how long a single `recv` call may block.
    fn set_poll_interval(&self, interval: Option<Duration>) -> Result<()>;

    /// Local address the socket is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Message delimiting behavior of this transport.
    fn kind(&self) -> TransportKind;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str {
        match self.kind() {
            TransportKind::Datagram => "udp",
            TransportKind::Stream => "tcp",
        }
    }
}

/// Returns true if `err` only signals that a poll interval elapsed.
pub fn is_poll_tick(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
