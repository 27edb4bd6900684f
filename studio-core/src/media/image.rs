//! Concept art through a hosted diffusion endpoint.

use crate::task::millis;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_IMAGE_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Style prefix prepended to every image prompt.
const STYLE_PREFIX: &str = "Concept art, video game style, masterpiece, ";

enum Attempt {
    Image(Vec<u8>),
    /// 503: the model is still loading on the provider side.
    WarmingUp,
    Rejected(reqwest::StatusCode),
}

/// Client for the image inference endpoint.
///
/// Every failure is logged and reported as `None`.
#[derive(Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    token: Option<String>,
    url: String,
    retry_backoff: Duration,
}

impl ImageClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.filter(|t| !t.trim().is_empty()),
            url: DEFAULT_IMAGE_URL.to_string(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Delay before the single retry on a cold model.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Generate one image. Retries once, after the backoff, if the model is
    /// warming up.
    pub async fn generate(&self, prompt: &str) -> Option<Vec<u8>> {
        let Some(token) = self.token.as_deref() else {
            debug!("image generation skipped: no token configured");
            return None;
        };
        let payload = json!({ "inputs": format!("{STYLE_PREFIX}{prompt}") });

        let first = self.attempt(token, &payload).await?;
        let outcome = match first {
            Attempt::WarmingUp => {
                info!(
                    backoff_ms = millis(self.retry_backoff),
                    "image model warming up, retrying once"
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.attempt(token, &payload).await?
            }
            other => other,
        };

        match outcome {
            Attempt::Image(bytes) => Some(bytes),
            Attempt::WarmingUp => {
                warn!("image model still warming up after retry");
                None
            }
            Attempt::Rejected(status) => {
                warn!(%status, "image request rejected");
                None
            }
        }
    }

    async fn attempt(&self, token: &str, payload: &serde_json::Value) -> Option<Attempt> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "image request failed"))
            .ok()?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Some(Attempt::WarmingUp);
        }
        if !status.is_success() {
            return Some(Attempt::Rejected(status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| warn!(error = %e, "image body unreadable"))
            .ok()?;
        if bytes.is_empty() {
            warn!("image endpoint returned an empty body");
            return None;
        }
        Some(Attempt::Image(bytes.to_vec()))
    }
}
