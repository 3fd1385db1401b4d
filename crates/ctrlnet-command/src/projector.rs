//! Projector power-query responder.

/// Substring that marks a power-state query.
pub const POWER_QUERY: &str = "PWR?";

/// Fixed reply to a power-state query, written without a terminator.
pub const POWER_REPLY: &[u8] = b"PWR=1";

/// Reply owed for one received line, if any.
pub fn projector_reply(line: &[u8]) -> Option<&'static [u8]> {
    let text = String::from_utf8_lossy(line);
    text.contains(POWER_QUERY).then_some(POWER_REPLY)
}
