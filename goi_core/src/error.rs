//! Error types for the goi_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for goi_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rating string outside the closed set {again, good, easy}
    #[error("invalid rating: {0:?} (expected again, good or easy)")]
    InvalidRating(String),

    /// Malformed input (empty term, empty definition, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced card does not exist or is not visible to the caller
    #[error("card not found")]
    NotFound,

    /// Ownership mismatch on a card mutation
    #[error("not authorized")]
    Forbidden,

    /// A user already holds a card for this term
    #[error("term {0:?} is already in the deck")]
    DuplicateTerm(String),

    /// Concurrent modification detected on persist; retryable
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rating or reveal submitted after the working queue was exhausted
    #[error("review session is complete")]
    SessionComplete,

    /// Underlying store unavailable or unreadable; retryable
    #[error("storage error: {0}")]
    Storage(String),
}
