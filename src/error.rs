//! Error types for scryfall-dl
//!
//! Only a handful of these ever abort a run (an unknown set, an unreachable
//! API, a bad configuration). Everything that goes wrong for a single record,
//! image or list line is counted and logged by the orchestrator instead of
//! being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scryfall-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scryfall-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem error tied to a specific path
    #[error("I/O error at {path}: {source}")]
    Path {
        /// The path the operation was acting on
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote endpoint answered with a non-success status
    #[error("HTTP {status} from {url}{}", body_excerpt(.body))]
    HttpStatus {
        /// The requested URL
        url: String,
        /// The HTTP status code returned
        status: u16,
        /// Response body, truncated, for diagnosis
        body: String,
    },

    /// The Scryfall API could not be used (unexpected status or payload)
    #[error("Scryfall API error: {0}")]
    Api(String),

    /// The requested set code does not denote a published set
    #[error("set '{0}' not found")]
    SetNotFound(String),

    /// The bulk-data index does not offer the requested feed
    #[error("bulk feed '{0}' not offered by the bulk-data index")]
    BulkFeedMissing(String),

    /// The bulk feed stream broke or could not be parsed
    #[error("bulk feed error: {0}")]
    Feed(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// `": <body>"`, or nothing for an empty body
fn body_excerpt(body: &str) -> String {
    match body.trim() {
        "" => String::new(),
        body => format!(": {body}"),
    }
}

impl Error {
    /// Build a [`Error::Path`] from an I/O error and the path it concerns
    pub fn at_path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Path {
            path: path.into(),
            source,
        }
    }

    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config { .. } => 2,
            Error::SetNotFound(_) => 3,
            Error::Network(_)
            | Error::HttpStatus { .. }
            | Error::Api(_)
            | Error::BulkFeedMissing(_)
            | Error::Feed(_) => 4,
            Error::Io(_) | Error::Path { .. } => 5,
            Error::Serialization(_) | Error::Other(_) => 1,
        }
    }
}
