//! Error types for the Export API client
//!
//! Every failure is reported to the immediate caller (return value or stream
//! item); nothing is retried or swallowed internally.

use thiserror::Error;

/// Main error type for Export API calls
#[derive(Error, Debug)]
pub enum ExportError {
    /// Transport could not complete the request (DNS, refused connection,
    /// broken stream). The raw transport error is carried as text only.
    #[error("unable to connect to the Export API endpoint: {0}")]
    Connection(String),

    /// A response body (or a complete line of it) was not valid JSON
    #[error("error parsing JSON answer from the Export API: {0}")]
    Parse(String),

    /// The service itself reported failure via an `{error, code}` record
    #[error("Export API error (code {code}): {message}")]
    Service { message: String, code: i64 },

    /// API key has no datacenter suffix
    #[error("invalid API key, expected `<id>-<datacenter>`: {0}")]
    InvalidKey(String),

    /// Name-based dispatch found no registered operation
    #[error("unknown Export API operation: {0}")]
    UnknownOperation(String),
}

/// Result type alias for Export API operations
pub type Result<T> = std::result::Result<T, ExportError>;
