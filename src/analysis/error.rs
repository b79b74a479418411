//! Error taxonomy for the analysis pipeline
//!
//! Every component has its own error type. They all fold into [`AnalyzeError`],
//! whose [`ErrorKind`] decides the machine-readable code and HTTP-equivalent
//! status reported to callers.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Classification of a failed analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
pub enum ErrorKind {
    /// Malformed or unsafe input, rejected before any I/O
    Validation,
    /// The repository does not exist or is not accessible
    NotFound,
    /// I/O, decode or infrastructure failure
    Internal,
    /// The overall analysis deadline elapsed
    Timeout,
    /// The caller aborted the request
    Cancelled,
    /// The caller's rate limiter rejected the request
    RateLimited,
}

impl ErrorKind {
    /// Wire code carried in error responses
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Internal | ErrorKind::Cancelled => "INTERNAL_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::RateLimited => "RATE_LIMIT_EXCEEDED",
        }
    }

    /// HTTP-equivalent status class for the error
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal | ErrorKind::Cancelled => 500,
            ErrorKind::Timeout => 408,
            ErrorKind::RateLimited => 429,
        }
    }
}

/// Rejected repository identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid characters in {0}")]
    UnsafeCharacters(&'static str),

    #[error("unrecognized repository reference: {0}")]
    Unparsable(String),
}

/// Failure while decoding a commit-log stream
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("log line {line} exceeds the {limit} byte limit")]
    LineTooLong { line: u64, limit: usize },

    #[error("failed to read commit log: {0}")]
    Io(#[from] std::io::Error),

    #[error("commit log decoding was cancelled")]
    Cancelled,
}

/// Failure while obtaining the commit-log stream for a repository
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("repository not found: {0}")]
    NotFound(String),

    #[error("failed to prepare working directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("git {command} failed: {details}")]
    Git { command: &'static str, details: String },

    #[error("git could not be started: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("acquisition was cancelled")]
    Cancelled,
}

/// Failure talking to the repository metadata service
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metadata service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid metadata service url: {0}")]
    Url(String),
}

/// Failure from a cache or database adapter
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("failed to encode stored value: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failure of a whole analysis request
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("repository {0} not found")]
    NotFound(String),

    #[error("failed to acquire commit history: {0}")]
    Acquire(AcquireError),

    #[error("failed to decode commit history: {0}")]
    Decode(DecodeError),

    #[error("analysis exceeded the {0} second limit")]
    Timeout(u64),

    #[error("analysis was cancelled")]
    Cancelled,
}

impl AnalyzeError {
    /// Classifies the error for the inbound API surface
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzeError::Validation(_) => ErrorKind::Validation,
            AnalyzeError::NotFound(_) => ErrorKind::NotFound,
            AnalyzeError::Acquire(_) | AnalyzeError::Decode(_) => ErrorKind::Internal,
            AnalyzeError::Timeout(_) => ErrorKind::Timeout,
            AnalyzeError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Message safe to show to the caller
    ///
    /// Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AnalyzeError::Validation(e) => e.to_string(),
            AnalyzeError::NotFound(_) => "Repository not found".to_string(),
            AnalyzeError::Acquire(_) => "Failed to clone repository".to_string(),
            AnalyzeError::Decode(_) => "Failed to analyze repository".to_string(),
            AnalyzeError::Timeout(secs) => format!("Analysis timed out after {} seconds", secs),
            AnalyzeError::Cancelled => "Analysis was cancelled".to_string(),
        }
    }
}

impl From<AcquireError> for AnalyzeError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::NotFound(repo) => AnalyzeError::NotFound(repo),
            AcquireError::Cancelled => AnalyzeError::Cancelled,
            other => AnalyzeError::Acquire(other),
        }
    }
}

impl From<DecodeError> for AnalyzeError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Cancelled => AnalyzeError::Cancelled,
            other => AnalyzeError::Decode(other),
        }
    }
}
