//! Errors a backup cycle can end with
//!
//! Every variant carries a prose message that already names the operation and
//! its target. Operators only ever see the message, so the variant exists for
//! logging and tests rather than for control flow.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    /// Network or authentication failure while opening the session
    #[error("{0}")]
    Connection(String),

    /// A remote command wrote to stderr, failed to start, or timed out
    #[error("{0}")]
    RemoteCommand(String),

    /// The archive could not be copied into the local directory
    #[error("{0}")]
    Transfer(String),

    /// The local backup directory could not be read
    #[error("{0}")]
    LocalIo(String),

    /// The local backup directory is at or above its quota
    #[error("{0}")]
    QuotaExceeded(String),
}

pub type CycleResult<T> = std::result::Result<T, CycleError>;
