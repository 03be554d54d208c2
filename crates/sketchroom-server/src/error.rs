//! Error types for the room server.

use thiserror::Error;

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// A connection asked for something its membership does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("not a member of room {0}")]
    NotMember(String),
}
