/// Errors that can occur while interpreting a command message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// A recognized command carried an argument that could not be parsed.
    #[error("invalid {command} command format: {message}")]
    MalformedArgument {
        command: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CommandError>;
