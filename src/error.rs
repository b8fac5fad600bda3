//! Custom error types for rustopenalex.
//!
//! All library functions return `Result<T, OpenAlexError>` instead of using `unwrap()`.
//! [`OpenAlexError::is_retryable`] is what the client consults before backing off.

use thiserror::Error;

/// Main error type for rustopenalex operations.
#[derive(Debug, Error)]
pub enum OpenAlexError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by the API after the retry budget was spent
    #[error("Rate limited after {attempts} attempts")]
    RateLimited {
        /// Total attempts made for the request
        attempts: u32,
    },

    /// API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message, usually the response body
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl OpenAlexError {
    /// Whether the failed request may succeed if sent again.
    ///
    /// Connection failures, timeouts and statuses in `retryable` qualify.
    /// Malformed bodies and other statuses do not.
    pub fn is_retryable(&self, retryable: &[u16]) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { code, .. } => retryable.contains(code),
            _ => false,
        }
    }
}

/// Result type alias using `OpenAlexError`
pub type Result<T> = std::result::Result<T, OpenAlexError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| OpenAlexError::Parse(msg.to_string()))
    }
}
