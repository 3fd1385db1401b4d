//! Delimiter-terminated message framing for stream transports.
//!
//! Stream transports deliver arbitrary slices of a byte stream. This crate
//! re-assembles them into discrete messages, each terminated by a fixed
//! sequence (CR LF by default):
//!
//! ```text
//! "AB" + "CD\r\nX\r" + "\n"  ->  "ABCD", "X"
//! ```
//!
//! Datagram transports do not need this layer.

pub mod codec;
pub mod error;
pub mod framer;

pub use codec::{decode_line, encode_line, FrameConfig, CRLF, DEFAULT_MAX_LINE_LEN};
pub use error::{FrameError, Result};
pub use framer::{LineFramer, Lines};
