//! Error types for studia.

use thiserror::Error;

/// Result type alias using studia's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every studia crate.
///
/// Handler code maps these onto HTTP responses in `studia-api`; everything
/// below that layer propagates them with `?`.
#[derive(Error, Debug)]
pub enum Error {
    /// Query or transaction failure from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A named resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The note id does not exist or belongs to someone else.
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// The error-book entry id does not exist or belongs to someone else.
    #[error("Error-book entry not found: {0}")]
    ErrorEntryNotFound(uuid::Uuid),

    /// No account row for the presented identity.
    #[error("User not found: {0}")]
    UserNotFound(uuid::Uuid),

    /// The generation backend failed or returned an error status.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Model produced output that does not match the requested shape.
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing or unusable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied data failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Outbound HTTP failure.
    #[error("Request error: {0}")]
    Request(String),

    /// Bug or impossible state.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Identity missing or not recognized.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity recognized but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
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
