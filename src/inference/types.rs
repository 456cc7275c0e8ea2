// inference/types.rs — Inference errors and stream alias

use futures::stream::BoxStream;
use thiserror::Error;

/// Incremental text fragments in the order the service emitted them
pub type FragmentStream = BoxStream<'static, Result<String, LLMError>>;

/// Inference transport errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LLMError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Authentication failed (HTTP {status}): {message}")]
    AuthenticationError { status: u16, message: String },

    #[error("Rate limit exceeded (HTTP 429): {0}")]
    RateLimited(String),

    #[error("Unsupported parameter '{parameter}': {message}")]
    UnsupportedParameter { parameter: String, message: String },

    #[error("Provider error (HTTP {status}): {message}")]
    HttpError { status: u16, message: String },

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl LLMError {
    /// HTTP status associated with the failure, when known
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LLMError::RateLimited(_) => Some(429),
            LLMError::HttpError { status, .. } => Some(*status),
            LLMError::AuthenticationError { status, .. } => Some(*status),
            LLMError::UnsupportedParameter { .. } => Some(400),
            _ => None,
        }
    }

    pub fn is_unsupported_parameter(&self) -> bool {
        matches!(self, LLMError::UnsupportedParameter { .. })
    }
}
