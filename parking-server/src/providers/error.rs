//! Data source error types.

use std::path::PathBuf;

/// Errors that can occur while fetching observations from a data source.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Reading the static dataset failed
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed
    #[error("unauthorized: check REMOTE_API_KEY")]
    Unauthorized,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Payload was not a list of valid records
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Provider cannot be constructed from the given settings
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
}
