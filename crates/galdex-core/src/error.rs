//! Error types for galdex.

use thiserror::Error;

/// Result type alias using galdex's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for galdex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Catalog entry not found by internal id
    #[error("Catalog entry not found: {0}")]
    EntryNotFound(i64),

    /// Malformed or missing input; operation never started
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Hard identifier collision with an existing entry
    #[error("Duplicate {field}: entry {slug} already uses this identifier")]
    Duplicate { field: String, slug: String },

    /// Image decode/encode/derivation failed
    #[error("Image error: {0}")]
    Image(String),

    /// Object storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cache provider error (advisory; callers fall through to source)
    #[error("Cache error: {0}")]
    Cache(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The human-readable message for errors that are part of the
    /// user-facing contract of mutating operations.
    ///
    /// Mutating endpoints return either a success payload or a plain error
    /// string; callers branch on the shape of the response. Validation,
    /// conflict, and not-found outcomes map to a string here. Infrastructure
    /// failures return `None` and are reported generically.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Error::Validation(_)
            | Error::Duplicate { .. }
            | Error::NotFound(_)
            | Error::EntryNotFound(_)
            | Error::Unauthorized(_)
            | Error::Image(_) => Some(self.to_string()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
