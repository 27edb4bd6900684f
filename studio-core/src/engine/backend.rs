//! Text generation backends.

use async_trait::async_trait;
use gemini::{Gemini, Request};
use std::time::Duration;
use thiserror::Error;

/// Errors from a text generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<gemini::Error> for BackendError {
    fn from(e: gemini::Error) -> Self {
        match e {
            gemini::Error::NoApiKey => BackendError::Unavailable("API key not configured".into()),
            gemini::Error::Timeout => BackendError::Timeout,
            other => BackendError::Request(other.to_string()),
        }
    }
}

/// Anything that can turn a prompt into text.
///
/// `generate_json` asks for a body constrained to JSON; callers still
/// validate what comes back.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate_json(&self, prompt: &str) -> Result<String, BackendError>;

    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Per-request timeout for generation calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[async_trait]
impl TextBackend for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_json(&self, prompt: &str) -> Result<String, BackendError> {
        let request = Request::new(prompt).json().with_timeout(REQUEST_TIMEOUT);
        Ok(self.complete(request).await?.text)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        let request = Request::new(prompt).with_timeout(REQUEST_TIMEOUT);
        Ok(self.complete(request).await?.text)
    }
}
