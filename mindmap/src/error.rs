//! Error taxonomy shared by the session and sync layers.
//!
//! Every variant ends the triggering operation. None of them are fatal to the
//! client: callers turn them into an error notification and carry on.

use thiserror::Error;

/// Result alias used by the client core.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Failure of a session or document operation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Caught before any request was sent (missing token, blank input, ...).
    #[error("{0}")]
    Precondition(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the body's `error` field, or the operation fallback.
        message: String,
    },

    /// The request could not complete.
    #[error("{0}")]
    Transport(String),

    /// A success response was missing a required field or had the wrong shape.
    #[error("{0}")]
    Protocol(String),

    /// The credential store could not be read or written.
    #[error("credential store: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "precondition",
            Self::Rejected { .. } => "rejected",
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Storage(_) => "storage",
        }
    }

    /// Whether the error was raised before anything left the process.
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}
