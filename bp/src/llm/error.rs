//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Build the error for a non-success HTTP status
    pub fn from_status(status: u16, retry_after: Option<Duration>, message: String) -> Self {
        if status == 429 {
            LlmError::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT),
            }
        } else {
            LlmError::ApiError { status, message }
        }
    }

    /// Whether another attempt could succeed
    ///
    /// Provider timeouts are final: the orchestrator bounds each LLM call and
    /// a retry would only run into that bound.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => matches!(status, 408 | 500 | 502 | 503 | 504 | 529),
            LlmError::Network(e) => !e.is_timeout(),
            LlmError::Timeout(_) | LlmError::InvalidResponse(_) | LlmError::Configuration(_) | LlmError::Json(_) => {
                false
            }
        }
    }

    /// Whether the failure was the provider call running out of time
    pub fn is_timeout(&self) -> bool {
        match self {
            LlmError::Timeout(_) => true,
            LlmError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Wait the provider asked for before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Wait used when a 429 carries no usable `retry-after` header
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        let err = LlmError::from_status(429, Some(Duration::from_secs(2)), String::new());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));

        let err = LlmError::from_status(429, None, String::new());
        assert_eq!(err.retry_after(), Some(DEFAULT_RATE_LIMIT_WAIT));

        let err = LlmError::from_status(401, None, "bad key".to_string());
        assert!(matches!(err, LlmError::ApiError { status: 401, .. }));
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_transient_statuses_retry() {
        for status in [408, 429, 500, 502, 503, 504, 529] {
            assert!(LlmError::from_status(status, None, String::new()).is_retryable(), "{status}");
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(!LlmError::from_status(status, None, String::new()).is_retryable(), "{status}");
        }
    }

    #[test]
    fn test_local_failures_are_final() {
        assert!(!LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::Configuration("missing key".to_string()).is_retryable());
        assert!(!LlmError::InvalidResponse("no choices".to_string()).is_retryable());
    }

    #[test]
    fn test_is_timeout() {
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_timeout());
        assert!(!LlmError::InvalidResponse("x".to_string()).is_timeout());
    }
}
