use thiserror::Error;

/// Result type alias for studychat-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared by the client, transcript and CLI crates
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure before an HTTP status was received
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("backend error: {status} - {body}")]
    Backend { status: u16, body: String },

    /// Backend rejected the credentials (HTTP 401)
    #[error("session expired, please log in again")]
    Unauthorized,

    /// Parse/serialization errors
    #[error("parse error: {0}")]
    Parse(String),

    /// Validation errors
    #[error("validation error: {0}")]
    Validation(String),

    /// Message store ordering violations
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Build a backend error from a status code and response body
    pub fn backend(status: u16, body: impl Into<String>) -> Self {
        Self::Backend { status, body: body.into() }
    }
}

/// Ordering violations rejected by the message store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Appended message is older than the newest timestamped entry
    #[error("message at {incoming} precedes newest entry at {newest}")]
    OutOfOrder { incoming: String, newest: String },

    /// Prepended batch is unsorted or overlaps the loaded range
    #[error("history batch is not ordered before the oldest entry: {0}")]
    UnorderedBatch(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
