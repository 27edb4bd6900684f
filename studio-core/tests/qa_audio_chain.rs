//! QA tests for the tiered audio fallback chain.
//!
//! No model runtimes are configured here, so the neural tiers report
//! themselves unavailable and the procedural tier has to carry every clip.
//!
//! Run with: `cargo test -p studio-core --test qa_audio_chain`

use studio_core::media::audio::{
    AudioChain, AudioRequest, MusicDuration, ProceduralStrategy, TierError,
};
use studio_core::testing::FailingStrategy;

fn wav_data_len(bytes: &[u8]) -> u32 {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).expect("valid wav");
    let spec = reader.spec();
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    reader.duration()
}

#[tokio::test]
async fn test_standard_chain_without_runtimes_falls_back_to_procedural() {
    let chain = AudioChain::standard(None, None);
    assert_eq!(
        chain.tier_names(),
        vec!["audiocraft", "transformers", "procedural"]
    );

    let request = AudioRequest::new("stormy harbour, low strings", MusicDuration::from_secs(2));
    let bytes = chain.generate(&request).await.expect("procedural tier succeeds");

    let reader = hound::WavReader::new(std::io::Cursor::new(&bytes[..])).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 32_000);
    assert_eq!(reader.duration(), 64_000);
}

#[tokio::test]
async fn test_unreachable_runtimes_fall_back_too() {
    // Nothing listens on port 9 locally; both neural tiers fail to connect.
    let chain = AudioChain::standard(
        Some("http://127.0.0.1:9".into()),
        Some("http://127.0.0.1:9".into()),
    );
    let request = AudioRequest::new("desert wind", MusicDuration::from_secs(1));
    let bytes = chain.generate(&request).await.unwrap();
    assert_eq!(wav_data_len(&bytes), 32_000);
}

#[tokio::test]
async fn test_procedural_clip_is_deterministic_per_prompt() {
    let chain = AudioChain::new(vec![Box::new(ProceduralStrategy)]);
    let a = chain
        .generate(&AudioRequest::new("neon rain", MusicDuration::from_secs(1)))
        .await
        .unwrap();
    let b = chain
        .generate(&AudioRequest::new("neon rain", MusicDuration::from_secs(1)))
        .await
        .unwrap();
    let c = chain
        .generate(&AudioRequest::new("forest dawn", MusicDuration::from_secs(1)))
        .await
        .unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[tokio::test]
async fn test_zero_duration_is_clamped() {
    let chain = AudioChain::new(vec![Box::new(ProceduralStrategy)]);
    let bytes = chain
        .generate(&AudioRequest::new("tick", MusicDuration::from_secs(0)))
        .await
        .unwrap();
    assert_eq!(wav_data_len(&bytes), 32_000);
}

#[tokio::test]
async fn test_total_failure_reports_every_tier() {
    let chain = AudioChain::new(vec![
        Box::new(FailingStrategy::new(
            "audiocraft",
            TierError::NotAvailable {
                runtime: "audiocraft",
                detail: "no runtime configured".into(),
            },
        )),
        Box::new(FailingStrategy::new("transformers", TierError::InvalidTensorShape)),
    ]);

    let failure = chain
        .generate(&AudioRequest::new("x", MusicDuration::default()))
        .await
        .unwrap_err();

    let message = failure.to_string();
    assert_eq!(message.matches("; ").count(), 1);
    assert!(message.starts_with("audiocraft: audiocraft_not_available"));
    assert!(message.ends_with("transformers: invalid_tensor_shape"));
}

#[tokio::test]
async fn test_empty_chain_has_no_backend() {
    let failure = AudioChain::new(Vec::new())
        .generate(&AudioRequest::new("x", MusicDuration::default()))
        .await
        .unwrap_err();
    assert!(failure.errors.is_empty());
    assert_eq!(failure.to_string(), "no_backend_available");
}
