//! Local music synthesis with tiered fallback.
//!
//! An [`AudioChain`] tries each [`AudioStrategy`] in order and returns the
//! first WAV produced. The standard chain is MusicGen through a dedicated
//! runtime, then a generic transformers runtime, then procedural ambience.
//! Every tier outputs 16-bit PCM WAV.

pub mod model;
pub mod neural;
pub mod procedural;
pub mod wav;

pub use model::{GenerationLength, LocalRuntime, ModelLoader, TextToAudioModel};
pub use neural::{AudiocraftStrategy, TransformersStrategy};
pub use procedural::ProceduralStrategy;
pub use wav::AudioTensor;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single tier failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TierError {
    #[error("{runtime}_not_available: {detail}")]
    NotAvailable {
        runtime: &'static str,
        detail: String,
    },

    #[error("model_load_failed: {0}")]
    ModelLoad(String),

    #[error("generation_failed: {0}")]
    Generation(String),

    #[error("empty_output")]
    EmptyOutput,

    #[error("unexpected_output_shape")]
    UnexpectedShape,

    #[error("invalid_tensor_shape")]
    InvalidTensorShape,

    #[error("pcm_conversion_failed: {0}")]
    PcmConversion(String),
}

/// Clip length in whole seconds, between one second and five minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MusicDuration(u32);

impl MusicDuration {
    pub const DEFAULT_SECS: u32 = 8;
    pub const MAX_SECS: u32 = 300;

    pub fn from_secs(secs: i64) -> Self {
        Self(secs.clamp(1, i64::from(Self::MAX_SECS)) as u32)
    }

    /// Parse an integer string; anything else yields the default.
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::from_secs)
            .unwrap_or_default()
    }

    pub fn secs(self) -> u32 {
        self.0
    }
}

impl Default for MusicDuration {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl From<i64> for MusicDuration {
    fn from(secs: i64) -> Self {
        Self::from_secs(secs)
    }
}

impl fmt::Display for MusicDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Model name used when none is configured.
pub const DEFAULT_MODEL_NAME: &str = "small";

/// Sound-effects model tried after a MusicGen id fails.
pub const AUDIOGEN_FALLBACK: &str = "facebook/audiogen-small";

/// Map a short model name to a hub id. Full ids pass through.
pub fn resolve_model_id(name: &str) -> String {
    let name = name.trim();
    if name.contains('/') {
        return name.to_string();
    }
    let name = if name.is_empty() { DEFAULT_MODEL_NAME } else { name };
    format!("facebook/musicgen-{}", name.to_ascii_lowercase())
}

/// Model ids the transformers tier tries, in order.
pub fn candidate_model_ids(name: &str) -> Vec<String> {
    let primary = resolve_model_id(name);
    let is_musicgen = primary.contains("musicgen");
    let mut ids = vec![primary];
    if is_musicgen {
        ids.push(AUDIOGEN_FALLBACK.to_string());
    }
    ids
}

/// One synthesis request, shared by every tier.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRequest {
    pub prompt: String,
    pub duration: MusicDuration,
    pub model_name: String,
    pub device: Option<String>,
}

impl AudioRequest {
    pub fn new(prompt: impl Into<String>, duration: MusicDuration) -> Self {
        Self {
            prompt: prompt.into(),
            duration,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            device: None,
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_device(mut self, device: Option<String>) -> Self {
        self.device = device.filter(|d| !d.trim().is_empty());
        self
    }
}

/// A single synthesis tier.
#[async_trait]
pub trait AudioStrategy: Send + Sync {
    /// Tier name used in error reports.
    fn name(&self) -> &str;

    async fn synthesize(&self, request: &AudioRequest) -> Result<Vec<u8>, TierError>;
}

/// Every tier failed. Holds each tier's error in chain order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainFailure {
    pub errors: Vec<(String, TierError)>,
}

impl fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("no_backend_available");
        }
        let joined: Vec<String> = self
            .errors
            .iter()
            .map(|(tier, err)| format!("{tier}: {err}"))
            .collect();
        f.write_str(&joined.join("; "))
    }
}

impl std::error::Error for ChainFailure {}

/// Ordered fallback over synthesis tiers.
pub struct AudioChain {
    strategies: Vec<Box<dyn AudioStrategy>>,
}

impl AudioChain {
    pub fn new(strategies: Vec<Box<dyn AudioStrategy>>) -> Self {
        Self { strategies }
    }

    /// The three standard tiers. A runtime without a URL reports itself as
    /// not available and the chain moves on.
    pub fn standard(audiocraft_url: Option<String>, transformers_url: Option<String>) -> Self {
        let audiocraft: Arc<dyn ModelLoader> =
            Arc::new(LocalRuntime::new("audiocraft", audiocraft_url));
        let transformers: Arc<dyn ModelLoader> =
            Arc::new(LocalRuntime::new("transformers", transformers_url));
        Self::new(vec![
            Box::new(AudiocraftStrategy::new(audiocraft)),
            Box::new(TransformersStrategy::new(transformers)),
            Box::new(ProceduralStrategy),
        ])
    }

    /// Standard tiers with runtime endpoints from the environment.
    pub fn from_env() -> Self {
        let settings = crate::config::AudioSettings::from_env();
        Self::standard(settings.audiocraft_url, settings.transformers_url)
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn generate(&self, request: &AudioRequest) -> Result<Vec<u8>, ChainFailure> {
        let mut failure = ChainFailure::default();

        for strategy in &self.strategies {
            debug!(tier = strategy.name(), "trying audio tier");
            match strategy.synthesize(request).await {
                Ok(bytes) => {
                    if !failure.errors.is_empty() {
                        info!(tier = strategy.name(), "audio produced by fallback tier");
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(tier = strategy.name(), error = %e, "audio tier failed");
                    failure.errors.push((strategy.name().to_string(), e));
                }
            }
        }

        Err(failure)
    }
}

/// Synthesize music through the standard chain configured from the
/// environment. Fails only if every tier fails.
pub async fn generate_local_music(
    prompt: &str,
    duration: impl Into<MusicDuration>,
    model_name: &str,
    device: Option<&str>,
) -> Result<Vec<u8>, ChainFailure> {
    let request = AudioRequest::new(prompt, duration.into())
        .with_model(model_name)
        .with_device(device.map(str::to_string));
    AudioChain::from_env().generate(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStrategy;

    #[test]
    fn test_duration_coercion() {
        assert_eq!(MusicDuration::from_secs(0).secs(), 1);
        assert_eq!(MusicDuration::from_secs(-4).secs(), 1);
        assert_eq!(MusicDuration::from_secs(12).secs(), 12);
        assert_eq!(MusicDuration::parse("abc").secs(), 8);
        assert_eq!(MusicDuration::parse(" 15 ").secs(), 15);
        assert_eq!(MusicDuration::parse("0").secs(), 1);
        assert_eq!(MusicDuration::default().secs(), 8);
    }

    #[test]
    fn test_duration_is_capped() {
        assert_eq!(MusicDuration::from_secs(300).secs(), 300);
        assert_eq!(MusicDuration::from_secs(301).secs(), MusicDuration::MAX_SECS);
        assert_eq!(MusicDuration::from_secs(i64::MAX).secs(), 300);
        assert_eq!(MusicDuration::parse("1000000000").secs(), 300);
        // Too large for i64 at all: treated as unparseable.
        assert_eq!(MusicDuration::parse("99999999999999999999").secs(), 8);
    }

    #[test]
    fn test_resolve_model_id() {
        assert_eq!(resolve_model_id("small"), "facebook/musicgen-small");
        assert_eq!(resolve_model_id("Melody"), "facebook/musicgen-melody");
        assert_eq!(resolve_model_id(""), "facebook/musicgen-small");
        assert_eq!(resolve_model_id("acme/tune-xl"), "acme/tune-xl");
    }

    #[test]
    fn test_candidates_add_audiogen_for_musicgen_only() {
        assert_eq!(
            candidate_model_ids("large"),
            vec!["facebook/musicgen-large", AUDIOGEN_FALLBACK]
        );
        assert_eq!(candidate_model_ids("acme/tune-xl"), vec!["acme/tune-xl"]);
    }

    #[test]
    fn test_chain_failure_display() {
        let failure = ChainFailure {
            errors: vec![
                (
                    "audiocraft".into(),
                    TierError::NotAvailable {
                        runtime: "audiocraft",
                        detail: "offline".into(),
                    },
                ),
                ("transformers".into(), TierError::EmptyOutput),
            ],
        };
        assert_eq!(
            failure.to_string(),
            "audiocraft: audiocraft_not_available: offline; transformers: empty_output"
        );
        assert_eq!(ChainFailure::default().to_string(), "no_backend_available");
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_procedural() {
        let chain = AudioChain::new(vec![
            Box::new(FailingStrategy::new("first", TierError::EmptyOutput)),
            Box::new(ProceduralStrategy),
        ]);
        let bytes = chain
            .generate(&AudioRequest::new("storm", 1.into()))
            .await
            .unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
    }

    #[tokio::test]
    async fn test_chain_collects_every_error() {
        let chain = AudioChain::new(vec![
            Box::new(FailingStrategy::new("a", TierError::UnexpectedShape)),
            Box::new(FailingStrategy::new("b", TierError::Generation("oom".into()))),
        ]);
        let failure = chain
            .generate(&AudioRequest::new("storm", 1.into()))
            .await
            .unwrap_err();
        assert_eq!(failure.errors.len(), 2);
        assert_eq!(
            failure.to_string(),
            "a: unexpected_output_shape; b: generation_failed: oom"
        );
    }

    #[tokio::test]
    async fn test_standard_chain_without_runtimes_uses_procedural() {
        let chain = AudioChain::standard(None, None);
        assert_eq!(
            chain.tier_names(),
            vec!["audiocraft", "transformers", "procedural"]
        );
        let request = AudioRequest::new("quiet forest", 1.into());
        let first = chain.generate(&request).await.unwrap();
        let second = chain.generate(&request).await.unwrap();
        assert_eq!(first, second);
    }
}
