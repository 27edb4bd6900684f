//! Procedural ambient synthesis: the last tier, which always works.
//!
//! Three sine voices from a fixed low scale, each with a slow tremolo, over
//! smoothed noise. The prompt seeds every random choice, so a prompt always
//! renders to the same bytes.

use super::wav::encode_wav;
use super::{AudioRequest, AudioStrategy, TierError};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::f64::consts::PI;

pub const SAMPLE_RATE: u32 = 32_000;

const SCALE: [f64; 6] = [110.0, 130.81, 146.83, 164.81, 196.0, 220.0];
const VOICES: usize = 3;
const NOISE_STD: f64 = 0.02;
const NOISE_TAPS: usize = 200;
const STEREO_OFFSET_SECS: f64 = 0.01;

/// Stable seed derived from the prompt text.
pub fn prompt_seed(prompt: &str) -> u64 {
    let digest = Sha256::digest(prompt.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// The three voice frequencies chosen for a prompt.
pub fn base_frequencies(prompt: &str) -> [f64; VOICES] {
    let mut rng = StdRng::seed_from_u64(prompt_seed(prompt));
    pick_voices(&mut rng)
}

fn pick_voices(rng: &mut StdRng) -> [f64; VOICES] {
    let mut picked = [0.0; VOICES];
    for (slot, freq) in picked.iter_mut().zip(SCALE.choose_multiple(rng, VOICES)) {
        *slot = *freq;
    }
    picked
}

/// Render `duration_secs` of stereo ambience as interleaved PCM16.
pub fn render(prompt: &str, duration_secs: u32) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(prompt_seed(prompt));
    let voices = pick_voices(&mut rng);

    let total = (SAMPLE_RATE as usize) * (duration_secs.max(1) as usize);
    let noise = gaussian_noise(&mut rng, total, NOISE_STD);
    let bed = moving_average(&noise, NOISE_TAPS);

    let left: Vec<f64> = (0..total)
        .map(|n| {
            let t = n as f64 / SAMPLE_RATE as f64;
            let tone: f64 = voices
                .iter()
                .enumerate()
                .map(|(i, freq)| {
                    let amp = 0.15 / (i as f64 + 1.0);
                    let lfo_rate = 0.05 + 0.02 * i as f64;
                    let lfo = 0.5 * (1.0 + (2.0 * PI * lfo_rate * t).sin());
                    amp * lfo * (2.0 * PI * freq * t).sin()
                })
                .sum();
            (tone + bed[n]).clamp(-1.0, 1.0)
        })
        .collect();

    let offset = ((STEREO_OFFSET_SECS * SAMPLE_RATE as f64) as usize) % total;
    let mut pcm = Vec::with_capacity(total * 2);
    for n in 0..total {
        let right = left[(n + total - offset) % total];
        pcm.push(to_i16(left[n]));
        pcm.push(to_i16(right));
    }
    pcm
}

fn to_i16(sample: f64) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Zero-mean normal samples via the Box-Muller transform, both outputs of
/// each pair used.
fn gaussian_noise(rng: &mut StdRng, len: usize, std_dev: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(len + 1);
    while out.len() < len {
        // gen() is in [0, 1); flip it so ln never sees zero.
        let u1 = 1.0 - rng.gen::<f64>();
        let u2 = rng.gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt() * std_dev;
        let angle = 2.0 * PI * u2;
        out.push(radius * angle.cos());
        out.push(radius * angle.sin());
    }
    out.truncate(len);
    out
}

/// Centered box filter with zero padding at the edges.
fn moving_average(input: &[f64], taps: usize) -> Vec<f64> {
    let half = taps / 2;
    let mut prefix = Vec::with_capacity(input.len() + 1);
    prefix.push(0.0);
    for value in input {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + value);
    }

    (0..input.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + taps - half).min(input.len());
            (prefix[end] - prefix[start]) / taps as f64
        })
        .collect()
}

/// Final fallback tier.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProceduralStrategy;

#[async_trait]
impl AudioStrategy for ProceduralStrategy {
    fn name(&self) -> &str {
        "procedural"
    }

    async fn synthesize(&self, request: &AudioRequest) -> Result<Vec<u8>, TierError> {
        let pcm = render(&request.prompt, request.duration.secs());
        encode_wav(&pcm, 2, SAMPLE_RATE)
    }
}
