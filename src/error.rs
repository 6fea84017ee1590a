//! Error types for the simulator

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Simulator error types
///
/// `Command` and `Protocol` are session-scoped: a command error is reported
/// back to the client in the tick reply, a protocol error closes the session.
/// Only `Config` aborts start-up. Collision rejection is not an error at all;
/// it is reported through the acceptance flag of a tick reply.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed maze, robot, or sensor description (fatal at start-up)
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or unsupported drive command (reported in the reply)
    #[error("command error: {0}")]
    Command(String),

    /// Transport-level violation (bad handshake, bad frame) - closes session
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
