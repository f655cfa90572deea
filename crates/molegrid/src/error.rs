//! Session error types.

use molegrid_core::BoardError;
use thiserror::Error;

/// Errors from the session layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The underlying board refused the operation.
    #[error(transparent)]
    Board(#[from] BoardError),

    /// Settings outside what a session offers.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Session config file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// `start()` on a session that is already playing.
    #[error("Session already in progress")]
    AlreadyPlaying,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
