//! Studio configuration.
//!
//! Everything is read from the environment. A missing credential disables
//! the feature it backs; nothing here fails.

use crate::media::audio::{MusicDuration, DEFAULT_MODEL_NAME};
use std::time::Duration;

/// Settings for the local music chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    /// MusicGen size (`small`, `medium`, ...) or a full model id.
    pub model_name: String,

    /// Inference device. `None` lets each runtime pick.
    pub device: Option<String>,

    /// Clip length.
    pub duration: MusicDuration,

    /// Endpoint of the MusicGen runtime.
    pub audiocraft_url: Option<String>,

    /// Endpoint of the generic transformers runtime.
    pub transformers_url: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            device: None,
            duration: MusicDuration::default(),
            audiocraft_url: None,
            transformers_url: None,
        }
    }
}

impl AudioSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            model_name: lookup("LOCAL_MUSICGEN_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            device: lookup("LOCAL_MUSICGEN_DEVICE"),
            duration: lookup("LOCAL_MUSICGEN_DURATION")
                .map(|raw| MusicDuration::parse(&raw))
                .unwrap_or_default(),
            audiocraft_url: lookup("AUDIOCRAFT_URL"),
            transformers_url: lookup("TRANSFORMERS_URL"),
        }
    }
}

/// Configuration for a [`Studio`](crate::Studio).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudioConfig {
    /// Credential for the text generation model.
    pub google_api_key: Option<String>,

    /// Text model override.
    pub gemini_model: Option<String>,

    /// Token for the image inference provider.
    pub hf_token: Option<String>,

    /// Image endpoint override.
    pub hf_image_url: Option<String>,

    /// Delay before retrying an image request that hit a cold model.
    pub image_retry_backoff: Option<Duration>,

    pub audio: AudioSettings,
}

impl StudioConfig {
    /// An empty config: every external feature disabled, procedural audio
    /// only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            google_api_key: lookup("GOOGLE_API_KEY"),
            gemini_model: lookup("GEMINI_MODEL"),
            hf_token: lookup("HF_TOKEN"),
            hf_image_url: lookup("HF_IMAGE_URL"),
            image_retry_backoff: None,
            audio: AudioSettings::from_lookup(&lookup),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = Some(model.into());
        self
    }

    pub fn with_hf_token(mut self, token: impl Into<String>) -> Self {
        self.hf_token = Some(token.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.hf_image_url = Some(url.into());
        self
    }

    pub fn with_image_retry_backoff(mut self, backoff: Duration) -> Self {
        self.image_retry_backoff = Some(backoff);
        self
    }

    pub fn with_audio(mut self, audio: AudioSettings) -> Self {
        self.audio = audio;
        self
    }
}

/// Non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
