//! Error handling - One hierarchy for the feed and the REST collaborators

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// bitso-feed error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be established
    #[error("Dial error: {0}")]
    Dial(String),

    /// Operation attempted without a live connection
    #[error("Not connected")]
    NotConnected,

    /// A second connect while a connection is still live
    #[error("Already connected")]
    AlreadyConnected,

    /// Transport write failed, fatal to the connection
    #[error("Write error: {0}")]
    Write(String),

    /// Malformed envelope, unexpected channel/action or payload decode failure
    #[error("Framing error: {0}")]
    Framing(String),

    /// Consumer did not keep up with the bounded delivery queue
    #[error("Queue overflow: consumer too slow (capacity {capacity})")]
    QueueOverflow { capacity: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Unreadable or unparseable HTTP response
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request-level failure reported by the exchange
    #[error("Bitso API error [{code}] {message}")]
    Api { code: String, message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Book code does not match the reference tables
    #[error("Invalid book: {0}")]
    InvalidBook(String),
}

impl Error {
    /// Errors that end the connection they were raised on
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Write(_) | Error::Framing(_) | Error::QueueOverflow { .. }
        )
    }
}
