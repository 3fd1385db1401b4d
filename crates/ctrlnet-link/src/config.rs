use std::time::Duration;

use tracing::Dispatch;

/// Maximum number of inbound messages held by a link's mailbox.
pub const MAX_DATA_SIZE: usize = 100;

/// How long a blocked receive waits before re-checking link state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Largest single receive: one maximal UDP datagram.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Remote host name or address messages are sent to.
    pub address: String,
    /// Remote port messages are sent to.
    pub remote_port: u16,
    /// Local port to bind. Zero picks an ephemeral port.
    pub local_port: u16,
    /// Initial enabled state. Default: true.
    pub enabled: bool,
    /// Mailbox capacity. Default: [`MAX_DATA_SIZE`].
    pub capacity: usize,
    /// Receive poll interval. Default: 50 ms.
    pub poll_interval: Duration,
    /// Receive buffer size in bytes. Default: 64 KiB.
    pub recv_buffer_size: usize,
    /// Subscriber the link logs to, including from its receive worker.
    /// Default: the dispatcher current when the link is constructed.
    pub dispatch: Option<Dispatch>,
}

impl LinkConfig {
    /// Configuration for a link to `address:remote_port` with defaults elsewhere.
    pub fn new(address: impl Into<String>, remote_port: u16) -> Self {
        Self {
            address: address.into(),
            remote_port,
            ..Self::default()
        }
    }

    pub fn with_local_port(mut self, local_port: u16) -> Self {
        self.local_port = local_port;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            remote_port: 0,
            local_port: 0,
            enabled: true,
            capacity: MAX_DATA_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            dispatch: None,
        }
    }
}
