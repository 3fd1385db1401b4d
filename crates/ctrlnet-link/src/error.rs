use std::fmt;
use std::io;

/// Errors returned to the consumer of a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error while setting up the link.
    #[error("transport error: {0}")]
    Transport(#[from] ctrlnet_transport::TransportError),

    /// Frame configuration rejected.
    #[error("frame error: {0}")]
    Frame(#[from] ctrlnet_frame::FrameError),

    /// The link has been disposed.
    #[error("link disposed")]
    Disposed,

    /// The receive worker thread could not be started.
    #[error("failed to spawn receive worker: {0}")]
    SpawnWorker(io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Which half of the link observed a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => f.write_str("send"),
            Direction::Receive => f.write_str("receive"),
        }
    }
}

/// The most recent non-fatal transport failure recorded by a link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{direction} failed: {message}")]
pub struct LinkFault {
    pub direction: Direction,
    pub kind: io::ErrorKind,
    pub message: String,
}

impl LinkFault {
    pub(crate) fn io(direction: Direction, err: &io::Error) -> Self {
        Self {
            direction,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub(crate) fn frame(err: &ctrlnet_frame::FrameError) -> Self {
        Self {
            direction: Direction::Receive,
            kind: io::ErrorKind::InvalidData,
            message: err.to_string(),
        }
    }
}
