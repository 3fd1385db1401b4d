use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Default line terminator: carriage return + line feed.
pub const CRLF: &[u8] = b"\r\n";

/// Default maximum number of bytes buffered without a terminator: 64 KiB.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Configuration for the line framer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Sequence that ends every message. Default: CR LF.
    pub terminator: &'static [u8],
    /// Maximum bytes buffered while waiting for a terminator. Default: 64 KiB.
    pub max_line_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            terminator: CRLF,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Append `payload` followed by the CR LF terminator.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────┐
/// │ Payload          │ 0D0A │
/// └──────────────────┴──────┘
/// ```
pub fn encode_line(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + CRLF.len());
    dst.put_slice(payload);
    dst.put_slice(CRLF);
}

/// Decode one terminated line from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a terminator yet.
/// On success, consumes the line and its terminator from the buffer and
/// returns the line without the terminator.
pub fn decode_line(
    src: &mut BytesMut,
    terminator: &[u8],
    max_line_len: usize,
) -> Result<Option<Bytes>> {
    let mut scanned = 0;
    decode_line_from(src, terminator, max_line_len, &mut scanned)
}

/// [`decode_line`] that skips the first `scanned` bytes when searching.
///
/// `scanned` is updated so that a following call with more data appended
/// only looks at bytes that could still hold a terminator. It is reset to
/// zero whenever a line is consumed.
pub(crate) fn decode_line_from(
    src: &mut BytesMut,
    terminator: &[u8],
    max_line_len: usize,
    scanned: &mut usize,
) -> Result<Option<Bytes>> {
    if terminator.is_empty() {
        return Err(FrameError::EmptyTerminator);
    }

    let start = (*scanned).min(src.len());
    match find(&src[start..], terminator) {
        Some(offset) => {
            let line = src.split_to(start + offset).freeze();
            src.advance(terminator.len());
            *scanned = 0;
            Ok(Some(line))
        }
        None if src.len() > max_line_len => {
            *scanned = 0;
            Err(FrameError::LineTooLong {
                size: src.len(),
                max: max_line_len,
            })
        }
        None => {
            // A terminator may straddle the end of the buffer.
            *scanned = src.len().saturating_sub(terminator.len() - 1);
            Ok(None)
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
