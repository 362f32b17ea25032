//! Error types for reference resolution and row expansion.

use std::time::Duration;

/// Errors that can occur while resolving references or expanding tables.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry returned an error status code.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the registry (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Failed to parse a registry response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Invalid registry base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A required column is absent from a table or mapping file.
    #[error("Column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for Results using [`ResolveError`].
pub type Result<T> = std::result::Result<T, ResolveError>;
