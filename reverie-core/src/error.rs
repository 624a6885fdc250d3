//! Error types for the reverie core library.

use thiserror::Error;

/// Top-level error type for all engine operations.
#[derive(Error, Debug)]
pub enum ReverieError {
    /// A memory with the given ID was not found.
    #[error("Memory not found: {0}")]
    MemoryNotFound(crate::MemoryId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An embedding did not have the expected dimensionality.
    #[error("Invalid embedding: expected {expected} dimensions, got {got}")]
    InvalidEmbedding {
        /// Dimensions the configured provider produces.
        expected: usize,
        /// Dimensions actually found.
        got: usize,
    },

    /// The embedding provider failed to produce a vector.
    #[error("Embedding provider error: {0}")]
    Embedding(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ReverieError>;
