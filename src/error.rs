//! Error types for the partition manager.

use thiserror::Error;

/// Result type alias for partition manager operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the partition manager.
///
/// None of these escape the public notification API; publish and handler
/// paths log and swallow them. The pure placement helpers return
/// [`Error::InvalidArgument`] directly because a contract violation there is
/// a caller bug.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller broke a contract: empty member list, empty bucket table,
    /// empty key parts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The replicated store or the membership view could not be reached.
    /// The current reconciliation aborts; the next view change retries.
    #[error("substrate unavailable: {0}")]
    SubstrateUnavailable(String),

    /// The definitions store failed or timed out during a cold load.
    /// Reconciliation proceeds with an empty trigger set.
    #[error("definitions unavailable: {0}")]
    DefinitionsUnavailable(String),

    /// A registered engine listener failed.
    #[error("listener fault: {0}")]
    ListenerFault(#[from] ListenerError),

    /// A replicated cell held bytes that could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Error reported by an engine listener.
///
/// Listeners run engine code the manager knows nothing about; whatever they
/// report is carried as an opaque message, logged at the invocation site,
/// and never propagated to other nodes.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Create a listener error from any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}
