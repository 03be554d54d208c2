//! Error types for the core library.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A host capability (text measurement, drawing surface) is not available.
    #[error("Rendering context unavailable: {0}")]
    MissingContext(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
