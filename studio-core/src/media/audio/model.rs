//! Neural text-to-audio runtimes.
//!
//! Models are served by local runtimes (one per framework) that expose a
//! small HTTP protocol: `POST /load` warms a model, `POST /generate`
//! returns a shaped float tensor. Loaded handles are cached for the life
//! of the process, keyed by runtime, model id and device.

use super::wav::AudioTensor;
use super::TierError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How much audio to ask a model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationLength {
    Seconds(u32),
    Tokens(usize),
}

/// A loaded text-to-audio model.
#[async_trait]
pub trait TextToAudioModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Audio frames per generated token, when the model reports it.
    fn frame_rate(&self) -> Option<u32>;

    async fn generate(&self, prompt: &str, length: GenerationLength)
        -> Result<AudioTensor, TierError>;
}

/// Loads models for one runtime.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Runtime name, used for cache keys and error messages.
    fn runtime(&self) -> &'static str;

    async fn load(
        &self,
        model_id: &str,
        device: &str,
    ) -> Result<Arc<dyn TextToAudioModel>, TierError>;
}

type CacheKey = (&'static str, String, String);

static MODEL_CACHE: Lazy<Mutex<HashMap<CacheKey, Arc<dyn TextToAudioModel>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load through the process-wide cache. Failed loads are not cached, so a
/// later call retries.
pub async fn load_cached(
    loader: &dyn ModelLoader,
    model_id: &str,
    device: &str,
) -> Result<Arc<dyn TextToAudioModel>, TierError> {
    let key = (loader.runtime(), model_id.to_string(), device.to_string());
    let mut cache = MODEL_CACHE.lock().await;
    if let Some(model) = cache.get(&key) {
        debug!(runtime = key.0, model_id, device, "model cache hit");
        return Ok(Arc::clone(model));
    }

    let model = loader.load(model_id, device).await?;
    info!(runtime = key.0, model_id, device, "model loaded");
    cache.insert(key, Arc::clone(&model));
    Ok(model)
}

/// Default sample rate of the MusicGen family.
pub const DEFAULT_SAMPLE_RATE: u32 = 32_000;

const LOAD_TIMEOUT: Duration = Duration::from_secs(120);
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for a local model runtime.
pub struct LocalRuntime {
    runtime: &'static str,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl LocalRuntime {
    /// A runtime reachable at `base_url`. `None` means the runtime is not
    /// installed; every load then reports it as unavailable.
    pub fn new(runtime: &'static str, base_url: Option<String>) -> Self {
        Self {
            runtime,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            client: reqwest::Client::new(),
        }
    }

    fn not_available(&self, detail: impl Into<String>) -> TierError {
        TierError::NotAvailable {
            runtime: self.runtime,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
    device: &'a str,
}

#[derive(Deserialize)]
struct LoadResponse {
    #[serde(default)]
    sample_rate: Option<u32>,
    #[serde(default)]
    frame_rate: Option<u32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    device: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    shape: Vec<usize>,
    #[serde(default)]
    samples: Option<Vec<f32>>,
}

#[async_trait]
impl ModelLoader for LocalRuntime {
    fn runtime(&self) -> &'static str {
        self.runtime
    }

    async fn load(
        &self,
        model_id: &str,
        device: &str,
    ) -> Result<Arc<dyn TextToAudioModel>, TierError> {
        let Some(base_url) = self.base_url.clone() else {
            return Err(self.not_available("no runtime endpoint configured"));
        };

        let response = self
            .client
            .post(format!("{base_url}/load"))
            .timeout(LOAD_TIMEOUT)
            .json(&LoadRequest {
                model: model_id,
                device,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    self.not_available(e.to_string())
                } else {
                    TierError::ModelLoad(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TierError::ModelLoad(format!("{model_id}: HTTP {status}: {body}")));
        }

        let info: LoadResponse = response
            .json()
            .await
            .map_err(|e| TierError::ModelLoad(e.to_string()))?;

        Ok(Arc::new(RemoteModel {
            client: self.client.clone(),
            base_url,
            model_id: model_id.to_string(),
            device: device.to_string(),
            sample_rate: info.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
            frame_rate: info.frame_rate,
        }))
    }
}

/// A model held by a local runtime.
struct RemoteModel {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
    device: String,
    sample_rate: u32,
    frame_rate: Option<u32>,
}

#[async_trait]
impl TextToAudioModel for RemoteModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_rate(&self) -> Option<u32> {
        self.frame_rate
    }

    async fn generate(
        &self,
        prompt: &str,
        length: GenerationLength,
    ) -> Result<AudioTensor, TierError> {
        let (duration, max_new_tokens) = match length {
            GenerationLength::Seconds(secs) => (Some(secs), None),
            GenerationLength::Tokens(tokens) => (None, Some(tokens)),
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .timeout(GENERATE_TIMEOUT)
            .json(&GenerateRequest {
                model: &self.model_id,
                device: &self.device,
                prompt,
                duration,
                max_new_tokens,
            })
            .send()
            .await
            .map_err(|e| TierError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TierError::Generation(format!("HTTP {status}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TierError::Generation(e.to_string()))?;

        match body.samples {
            Some(samples) if !samples.is_empty() => AudioTensor::new(body.shape, samples),
            _ => Err(TierError::EmptyOutput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SilentModel;

    #[async_trait]
    impl TextToAudioModel for SilentModel {
        fn model_id(&self) -> &str {
            "silent"
        }

        fn sample_rate(&self) -> u32 {
            DEFAULT_SAMPLE_RATE
        }

        fn frame_rate(&self) -> Option<u32> {
            None
        }

        async fn generate(
            &self,
            _prompt: &str,
            _length: GenerationLength,
        ) -> Result<AudioTensor, TierError> {
            AudioTensor::new(vec![1, 4], vec![0.0; 4])
        }
    }

    struct CountingLoader {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        fn runtime(&self) -> &'static str {
            if self.fail_first {
                "counting-flaky"
            } else {
                "counting"
            }
        }

        async fn load(
            &self,
            _model_id: &str,
            _device: &str,
        ) -> Result<Arc<dyn TextToAudioModel>, TierError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(TierError::ModelLoad("first load fails".into()));
            }
            Ok(Arc::new(SilentModel))
        }
    }

    #[tokio::test]
    async fn test_cache_loads_once_per_key() {
        let loader = CountingLoader {
            calls: AtomicUsize::new(0),
            fail_first: false,
        };

        load_cached(&loader, "m", "cpu").await.unwrap();
        load_cached(&loader, "m", "cpu").await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

        load_cached(&loader, "m", "cuda").await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_loads_are_not_cached() {
        let loader = CountingLoader {
            calls: AtomicUsize::new(0),
            fail_first: true,
        };

        assert!(load_cached(&loader, "m", "cpu").await.is_err());
        assert!(load_cached(&loader, "m", "cpu").await.is_ok());
        assert!(load_cached(&loader, "m", "cpu").await.is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_runtime_is_not_available() {
        let runtime = LocalRuntime::new("audiocraft", None);
        let err = match runtime.load("small", "").await {
            Err(e) => e,
            Ok(_) => panic!("load should fail without an endpoint"),
        };
        assert!(matches!(
            err,
            TierError::NotAvailable {
                runtime: "audiocraft",
                ..
            }
        ));
    }
}
