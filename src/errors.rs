/*!
 * Error types for the memo-ocr application.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: failures talking to the remote Read API
 * - `OcrError`: outcomes of the submit/poll sequence
 * - `AppError`: application-level wrapper used by the CLI
 */

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when working with the Read API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when building or sending an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Seconds to wait, from the Retry-After header
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The submission response carried no job-handle header
    #[error("Response is missing the '{0}' header")]
    MissingJobHandle(String),

    /// The job-handle header was present but is not an absolute URL
    #[error("Invalid job handle '{value}': {reason}")]
    InvalidJobHandle {
        /// Raw header value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Connection drops, timeouts, rate limiting and 5xx responses are transient.
    /// Authentication failures, client errors and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) | Self::RateLimitExceeded { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Delay requested by the server before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after_secs: Some(secs), .. } => {
                Some(Duration::from_secs(*secs))
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Outcomes of a submit/poll recognition sequence other than success
#[derive(Error, Debug)]
pub enum OcrError {
    /// The image could not be submitted or no job handle came back
    #[error("Submission failed: {0}")]
    Submission(#[source] ProviderError),

    /// A status check failed and could not be recovered by retrying
    #[error("Status check {attempt} failed: {source}")]
    Poll {
        /// 1-based poll attempt that failed
        attempt: u32,
        /// Underlying transport error
        #[source]
        source: ProviderError,
    },

    /// The job did not reach a terminal status within the polling budget
    #[error("Recognition did not finish after {attempts} status checks ({elapsed:?})")]
    Timeout {
        /// Status checks performed
        attempts: u32,
        /// Time spent polling
        elapsed: Duration,
    },

    /// The remote service reported the job as failed
    #[error("Recognition job failed: {job}")]
    JobFailed {
        /// Job handle of the failed operation
        job: String,
    },

    /// The sequence was cancelled by the caller
    #[error("Recognition cancelled")]
    Cancelled,

    /// An empty image buffer was supplied
    #[error("Image payload is empty")]
    EmptyImage,

    /// The sequencer was configured with unusable settings
    #[error("Invalid OCR configuration: {0}")]
    Config(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from recognition
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
