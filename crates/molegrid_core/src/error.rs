//! # Board Error Types
//!
//! All errors that can occur while configuring or driving a board.

use thiserror::Error;

/// Errors that can occur in the board core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Board dimensions, capacity or timing rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A hit addressed a cell that does not exist on this board.
    #[error("index out of range: {index} (board has {cell_count} cells)")]
    IndexOutOfRange {
        /// The index that was requested.
        index: usize,
        /// Number of cells on the board.
        cell_count: usize,
    },

    /// Hit or stop issued while the board is not running.
    #[error("board is not running")]
    InactiveBoard,

    /// Start issued while the board is already running.
    #[error("board is already running")]
    AlreadyRunning,

    /// The OS refused to spawn an actor thread.
    #[error("failed to spawn actor thread: {0}")]
    ThreadSpawn(String),

    /// A configuration file could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Config(String),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;
