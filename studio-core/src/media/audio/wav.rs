//! Tensor handling and PCM16 WAV encoding shared by every tier.

use super::TierError;
use std::io::Cursor;

/// Raw model output: row-major `f32` samples with an explicit shape.
///
/// Rank 2 is `[channels, samples]`; rank 3 adds a leading batch axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl AudioTensor {
    /// Build a tensor, rejecting data whose length does not match the shape.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, TierError> {
        let expected = shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
        if shape.is_empty() || expected != Some(data.len()) {
            return Err(TierError::UnexpectedShape);
        }
        Ok(Self { shape, data })
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Drop the batch axis of a rank-3 tensor, keeping batch 0.
    pub fn first_batch(self) -> Result<Self, TierError> {
        if self.rank() != 3 {
            return Err(TierError::UnexpectedShape);
        }
        let (channels, samples) = (self.shape[1], self.shape[2]);
        let data = channels
            .checked_mul(samples)
            .and_then(|len| self.data.get(..len))
            .ok_or(TierError::UnexpectedShape)?
            .to_vec();
        Ok(Self {
            shape: vec![channels, samples],
            data,
        })
    }

    /// Keep only row 0 of a rank-2 tensor, as a single channel.
    pub fn first_row_as_mono(self) -> Result<Self, TierError> {
        if self.rank() != 2 {
            return Err(TierError::UnexpectedShape);
        }
        let samples = self.shape[1];
        let data = self
            .data
            .get(..samples)
            .ok_or(TierError::UnexpectedShape)?
            .to_vec();
        Ok(Self {
            shape: vec![1, samples],
            data,
        })
    }
}

/// Convert a `[channels, samples]` tensor to interleaved 16-bit PCM.
pub fn tensor_to_pcm16(tensor: &AudioTensor) -> Result<(Vec<i16>, u16), TierError> {
    if tensor.rank() != 2 {
        return Err(TierError::InvalidTensorShape);
    }
    let (channels, samples) = (tensor.shape[0], tensor.shape[1]);
    if channels == 0 || samples == 0 {
        return Err(TierError::EmptyOutput);
    }
    let channel_count =
        u16::try_from(channels).map_err(|_| TierError::PcmConversion("too many channels".into()))?;

    let mut pcm = Vec::with_capacity(channels * samples);
    for idx in 0..samples {
        for channel in 0..channels {
            pcm.push(to_i16(tensor.data[channel * samples + idx]));
        }
    }
    Ok((pcm, channel_count))
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Wrap interleaved PCM16 samples in a WAV container.
pub fn encode_wav(pcm: &[i16], channels: u16, sample_rate: u32) -> Result<Vec<u8>, TierError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)
            .map_err(|e| TierError::PcmConversion(e.to_string()))?;
        for &sample in pcm {
            writer
                .write_sample(sample)
                .map_err(|e| TierError::PcmConversion(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| TierError::PcmConversion(e.to_string()))?;
    }
    Ok(buffer.into_inner())
}
