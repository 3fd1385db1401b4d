/// Errors that can occur while framing a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Buffered bytes exceeded the configured maximum without a terminator.
    #[error("line too long ({size} bytes buffered without terminator, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// The configured terminator sequence is empty.
    #[error("line terminator must not be empty")]
    EmptyTerminator,
}

pub type Result<T> = std::result::Result<T, FrameError>;
