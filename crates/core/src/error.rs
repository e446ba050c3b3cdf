//! Error taxonomy for the interview core.
//!
//! Validation errors are reported straight back to the caller and never touch
//! the session. Gateway errors are recovered inside the state machine. Configuration
//! errors are fatal at startup.

use thiserror::Error;

/// Rejected respondent or UI action. The session is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("interview not started: consent has not been given")]
    NotStarted,
    #[error("interview is already complete")]
    Complete,
    #[error("{operation} is not allowed while {state}")]
    IllegalState {
        operation: &'static str,
        state: String,
    },
}

/// Failure reported by a language-model gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("authentication with the model provider failed: {0}")]
    Authentication(String),
    #[error("rate limited by the model provider: {0}")]
    RateLimited(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("model call timed out")]
    Timeout,
    #[error("model provider returned status {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("model provider returned an empty completion")]
    EmptyResponse,
}

impl GatewayError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::RateLimited(_) | GatewayError::Network(_) | GatewayError::Timeout => true,
            GatewayError::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Malformed(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Invalid or incomplete startup configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("topic list is empty")]
    EmptyTopics,
    #[error("topic {0} is blank")]
    BlankTopic(usize),
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write csv transcript: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to finish csv transcript: {0}")]
    Flush(String),
}
