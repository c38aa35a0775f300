//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while executing a prompt
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("Unknown LLM provider: '{0}'. Supported: xai, openai")]
    UnknownProvider(String),
}

impl LlmError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status == 408 || *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::MissingApiKey(_) => false,
            LlmError::UnknownProvider(_) => false,
        }
    }

    /// HTTP-style status for reporting
    pub fn status(&self) -> u16 {
        match self {
            LlmError::RateLimited { .. } => 429,
            LlmError::ApiError { status, .. } => *status,
            LlmError::Network(e) => e.status().map(|s| s.as_u16()).unwrap_or(503),
            LlmError::Timeout(_) => 504,
            LlmError::InvalidResponse(_) => 502,
            LlmError::MissingApiKey(_) => 401,
            LlmError::UnknownProvider(_) => 400,
        }
    }

    /// Wait the server asked for, if this is a rate limit that named one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::RateLimited {
                retry_after: Some(Duration::from_secs(60))
            }
            .is_retryable()
        );

        assert!(
            LlmError::ApiError {
                status: 503,
                message: "Unavailable".to_string()
            }
            .is_retryable()
        );

        assert!(
            LlmError::ApiError {
                status: 408,
                message: "Request timeout".to_string()
            }
            .is_retryable()
        );

        // 4xx errors should not be retryable
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );

        assert!(!LlmError::MissingApiKey("XAI_API_KEY".to_string()).is_retryable());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
        assert!(!LlmError::UnknownProvider("bard".to_string()).is_retryable());
    }

    #[test]
    fn test_status() {
        assert_eq!(
            LlmError::ApiError {
                status: 403,
                message: "Forbidden".to_string()
            }
            .status(),
            403
        );
        assert_eq!(
            LlmError::RateLimited { retry_after: None }.status(),
            429
        );
        assert_eq!(LlmError::UnknownProvider("bard".to_string()).status(), 400);
        assert_eq!(LlmError::Timeout(Duration::from_secs(30)).status(), 504);
    }

    #[test]
    fn test_retry_after() {
        let err = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(LlmError::RateLimited { retry_after: None }.retry_after(), None);
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).retry_after(), None);
    }
}
