//! Error types for postboard

use thiserror::Error;

/// Result type alias for postboard operations
pub type Result<T> = std::result::Result<T, PostboardError>;

/// Main error type for postboard
#[derive(Error, Debug)]
pub enum PostboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),
}
