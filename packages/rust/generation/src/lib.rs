//! Text generation collaborator.
//!
//! The pipeline only knows the [`GenerationClient`] trait: a prompt goes in,
//! text or a [`GenerationError`] comes out. [`ChatCompletionsClient`] talks to
//! any OpenAI-compatible `/chat/completions` endpoint. The client never
//! retries; a failed call is reported to the caller as-is.

mod chat;

use async_trait::async_trait;

pub use chat::ChatCompletionsClient;

/// Errors a single generation call can end with.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The request never got a response (DNS, TLS, connect, timeout).
    #[error("failed to reach generation service: {0}")]
    Connection(String),

    /// The service answered with a non-success status.
    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("invalid response from generation service: {0}")]
    InvalidResponse(String),

    /// The response decoded but carried no text.
    #[error("generation service returned no text")]
    EmptyResponse,
}

/// Convenience alias for generation outcomes.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

impl From<GenerationError> for horoscope_shared::HoroscopeError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err.to_string())
    }
}

/// A text generation backend, constructed once and passed to the pipeline.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for a fully substituted prompt.
    async fn generate(&self, prompt: &str) -> GenerationResult<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = GenerationError::Status {
            status: 429,
            body: "quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "generation service returned HTTP 429: quota exceeded"
        );
        assert_eq!(
            GenerationError::EmptyResponse.to_string(),
            "generation service returned no text"
        );
    }

    #[test]
    fn converts_into_shared_error() {
        let err: horoscope_shared::HoroscopeError =
            GenerationError::Connection("refused".into()).into();
        assert!(matches!(err, horoscope_shared::HoroscopeError::Generation(_)));
        assert!(err.to_string().contains("refused"));
    }
}
