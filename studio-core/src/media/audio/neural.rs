//! The two neural tiers: a music-specific runtime first, then a general
//! transformers runtime that can also fall back to a sound-effects model.

use super::model::{load_cached, GenerationLength, ModelLoader};
use super::wav::{encode_wav, tensor_to_pcm16, AudioTensor};
use super::{candidate_model_ids, AudioRequest, AudioStrategy, TierError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Frames per token assumed when a model does not report one.
pub const DEFAULT_FRAME_RATE: u32 = 50;

/// Device used by the transformers tier when none is configured.
pub const DEFAULT_DEVICE: &str = "cpu";

/// Token budget for a clip: one token per frame, at least one.
pub fn max_new_tokens(duration_secs: u32, frame_rate: u32) -> usize {
    (duration_secs as usize * frame_rate as usize).max(1)
}

/// Tier 1: MusicGen through a dedicated runtime. The model name is passed
/// through unchanged (`small`, `medium`, or a full id).
pub struct AudiocraftStrategy {
    loader: Arc<dyn ModelLoader>,
}

impl AudiocraftStrategy {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl AudioStrategy for AudiocraftStrategy {
    fn name(&self) -> &str {
        "audiocraft"
    }

    async fn synthesize(&self, request: &AudioRequest) -> Result<Vec<u8>, TierError> {
        let device = request.device.as_deref().unwrap_or("");
        let model = load_cached(self.loader.as_ref(), &request.model_name, device).await?;

        let tensor = model
            .generate(
                &request.prompt,
                GenerationLength::Seconds(request.duration.secs()),
            )
            .await?;

        let tensor = match tensor.rank() {
            3 => tensor.first_batch()?,
            2 => tensor,
            _ => return Err(TierError::UnexpectedShape),
        };

        let (pcm, channels) = tensor_to_pcm16(&tensor)?;
        encode_wav(&pcm, channels, model.sample_rate())
    }
}

/// Tier 2: a generic transformers runtime. Tries each candidate model in
/// order and keeps the last error if none of them works.
pub struct TransformersStrategy {
    loader: Arc<dyn ModelLoader>,
}

impl TransformersStrategy {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }
}

/// Reduce model output to a single channel, taking batch 0 and row 0.
fn to_mono(tensor: AudioTensor) -> Result<AudioTensor, TierError> {
    match tensor.rank() {
        3 => tensor.first_batch()?.first_row_as_mono(),
        2 => tensor.first_row_as_mono(),
        _ => Err(TierError::UnexpectedShape),
    }
}

#[async_trait]
impl AudioStrategy for TransformersStrategy {
    fn name(&self) -> &str {
        "transformers"
    }

    async fn synthesize(&self, request: &AudioRequest) -> Result<Vec<u8>, TierError> {
        let device = request.device.as_deref().unwrap_or(DEFAULT_DEVICE);
        let mut last_error = None;

        for model_id in candidate_model_ids(&request.model_name) {
            debug!(model_id = model_id.as_str(), device, "trying transformers model");

            let model = match load_cached(self.loader.as_ref(), &model_id, device).await {
                Ok(model) => model,
                Err(e) => {
                    warn!(model_id = model_id.as_str(), error = %e, "model load failed");
                    last_error = Some(e);
                    continue;
                }
            };

            let frame_rate = model.frame_rate().unwrap_or(DEFAULT_FRAME_RATE);
            let tokens = max_new_tokens(request.duration.secs(), frame_rate);

            let attempt = async {
                let tensor = model
                    .generate(&request.prompt, GenerationLength::Tokens(tokens))
                    .await?;
                let (pcm, channels) = tensor_to_pcm16(&to_mono(tensor)?)?;
                encode_wav(&pcm, channels, model.sample_rate())
            };

            match attempt.await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(model_id = model_id.as_str(), error = %e, "generation failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TierError::ModelLoad("no candidate models".into())))
    }
}
