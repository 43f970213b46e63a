//! Error types for reportwatch-core

use thiserror::Error;

/// Main error type for the reportwatch-core library
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Log endpoint answered but reported failure or an unusable body
    #[error("{stream} endpoint error: {message}")]
    Endpoint { stream: String, message: String },

    /// Structured extraction of a tool result failed
    #[error("extraction error in {tool}: {message}")]
    Extract { tool: String, message: String },
}

/// Result type alias for reportwatch-core
pub type Result<T> = std::result::Result<T, Error>;
