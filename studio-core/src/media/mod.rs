//! Media generation: concept art and soundtrack clips.
//!
//! [`MediaGenerator`] is a thin facade over the image client and the audio
//! chain; it does no caching. [`MediaCache`] memoizes results per item and
//! lives in the application state.

pub mod audio;
pub mod image;
pub mod music;

pub use image::ImageClient;
pub use music::MusicProfile;

use crate::config::{AudioSettings, StudioConfig};
use crate::engine::TextBackend;
use crate::proposal::{ItemId, ProposalItem};
use audio::{AudioChain, AudioRequest};
use std::collections::HashMap;
use tracing::warn;

/// Kind of generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

/// Per-item memo of generated media.
///
/// A generation that produced nothing is cached too, so a failed image is
/// not retried on every view of the same item.
#[derive(Debug, Clone, Default)]
pub struct MediaCache {
    entries: HashMap<(ItemId, MediaKind), Option<Vec<u8>>>,
}

impl MediaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a generation for this item and kind has been recorded.
    pub fn contains(&self, id: ItemId, kind: MediaKind) -> bool {
        self.entries.contains_key(&(id, kind))
    }

    /// Cached bytes, if a generation succeeded.
    pub fn get(&self, id: ItemId, kind: MediaKind) -> Option<&[u8]> {
        self.entries.get(&(id, kind))?.as_deref()
    }

    pub fn insert(&mut self, id: ItemId, kind: MediaKind, bytes: Option<Vec<u8>>) {
        self.entries.insert((id, kind), bytes);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Image and audio generation behind one interface.
pub struct MediaGenerator {
    image: ImageClient,
    audio: AudioChain,
    settings: AudioSettings,
}

impl MediaGenerator {
    pub fn new(image: ImageClient, audio: AudioChain, settings: AudioSettings) -> Self {
        Self {
            image,
            audio,
            settings,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        let mut image = ImageClient::new(config.hf_token.clone());
        if let Some(url) = &config.hf_image_url {
            image = image.with_url(url.clone());
        }
        if let Some(backoff) = config.image_retry_backoff {
            image = image.with_retry_backoff(backoff);
        }
        let audio = AudioChain::standard(
            config.audio.audiocraft_url.clone(),
            config.audio.transformers_url.clone(),
        );
        Self::new(image, audio, config.audio.clone())
    }

    /// Concept art for the prompt, or `None` on any failure.
    pub async fn generate_image(&self, prompt: &str) -> Option<Vec<u8>> {
        self.image.generate(prompt).await
    }

    /// A WAV clip for the prompt using the configured model, device and
    /// duration. `None` only if every tier failed.
    pub async fn generate_audio(&self, prompt: &str) -> Option<Vec<u8>> {
        let request = AudioRequest::new(prompt, self.settings.duration)
            .with_model(self.settings.model_name.clone())
            .with_device(self.settings.device.clone());

        match self.audio.generate(&request).await {
            Ok(bytes) => Some(bytes),
            Err(failure) => {
                warn!(error = %failure, "all audio tiers failed");
                None
            }
        }
    }

    /// Soundtrack prompt for an item, derived from a music profile.
    pub async fn soundtrack_prompt(
        &self,
        backend: Option<&dyn TextBackend>,
        item: &ProposalItem,
    ) -> String {
        MusicProfile::derive(backend, item).await.to_prompt(item)
    }
}
