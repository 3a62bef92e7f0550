//! Error types for termdeck-llm

use thiserror::Error;

/// Provider failure
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials or settings
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The server rejected the credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested model is not installed or does not exist
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The server answered with an error
    #[error("api error: {0}")]
    Api(String),

    /// HTTP 429
    #[error("rate limit exceeded")]
    RateLimit,

    /// The reply could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// No answer within the transport timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Anything else: client construction, scripted mock failures
    #[error("provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Whether the same request could succeed later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network(_) | Self::Timeout(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Timeout(1500).to_string(), "timeout after 1500ms");
        assert_eq!(
            Error::ModelNotFound("llama3".into()).to_string(),
            "model not found: llama3"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::RateLimit.is_transient());
        assert!(Error::Network("refused".into()).is_transient());
        assert!(!Error::Unauthorized("bad key".into()).is_transient());
        assert!(!Error::InvalidResponse("bad json".into()).is_transient());
    }
}
