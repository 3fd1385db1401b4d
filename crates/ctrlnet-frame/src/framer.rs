use bytes::{Bytes, BytesMut};
use tracing::warn;

use crate::codec::{decode_line_from, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Re-assembles terminated messages from an accumulating byte stream.
///
/// Bytes that do not yet end in a terminator are kept for the next
/// [`feed`](LineFramer::feed), so a message may arrive split across any
/// number of reads.
#[derive(Debug)]
pub struct LineFramer {
    buf: BytesMut,
    /// Prefix of `buf` already searched for a terminator.
    scanned: usize,
    config: FrameConfig,
}

impl LineFramer {
    /// Create a framer splitting on CR LF.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            config: FrameConfig::default(),
        }
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Result<Self> {
        if config.terminator.is_empty() {
            return Err(FrameError::EmptyTerminator);
        }
        Ok(Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            config,
        })
    }

    /// Append `bytes` and iterate over every message completed by them.
    ///
    /// The iterator is lazy: drive it to the end to extract all complete
    /// messages. Leftover bytes without a terminator stay buffered. When the
    /// buffer overflows `max_line_len` the iterator yields one
    /// [`FrameError::LineTooLong`] and the buffer is discarded.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.buf.extend_from_slice(bytes);
        Lines { framer: self }
    }

    /// Bytes received since the last complete message.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Drop any partially received message.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages completed by one [`LineFramer::feed`] call.
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        let framer = &mut *self.framer;
        match decode_line_from(
            &mut framer.buf,
            framer.config.terminator,
            framer.config.max_line_len,
            &mut framer.scanned,
        ) {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "discarding unterminated input");
                framer.clear();
                Some(Err(err))
            }
        }
    }
}
