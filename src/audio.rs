//! WAV ingestion and waveform preprocessing.
//!
//! Decoding produces a mono waveform at the file's native sample rate; tone
//! features are computed on that directly. `preprocess_for_embedding` applies
//! the resample-and-normalize step the speaker encoder expects.

use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

/// Sample rate the speaker encoder operates at.
pub const EMBED_SAMPLE_RATE: u32 = 16_000;

/// Peak level audio is normalized to before embedding.
const NORMALIZE_PEAK: f32 = 0.95;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to decode WAV: {0}")]
    Decode(String),

    #[error("unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    #[error("audio contains no samples")]
    Empty,
}

/// A decoded mono waveform.
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode a WAV file from disk.
pub fn decode_wav_file(path: &Path) -> Result<Waveform, AudioError> {
    let reader = hound::WavReader::open(path).map_err(|e| AudioError::Decode(e.to_string()))?;
    decode(reader)
}

/// Decode a WAV file from an in-memory byte buffer (HTTP uploads).
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<Waveform, AudioError> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode(e.to_string()))?;
    decode(reader)
}

fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<Waveform, AudioError> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(AudioError::UnsupportedFormat("zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
        (hound::SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32))
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit {:?}",
                bits, format
            )))
        }
    };

    if interleaved.is_empty() {
        return Err(AudioError::Empty);
    }

    Ok(Waveform {
        samples: downmix_mono(&interleaved, channels),
        sample_rate: spec.sample_rate,
    })
}

/// Average interleaved channels down to mono.
pub fn downmix_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampler.
///
/// Offline file conversion only; no anti-aliasing filter.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.len() < 2 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 / ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

/// Prepare a waveform for the speaker encoder: resample to 16 kHz and
/// normalize to a fixed peak level.
pub fn preprocess_for_embedding(wave: &Waveform) -> Vec<f32> {
    let mut samples = resample_linear(&wave.samples, wave.sample_rate, EMBED_SAMPLE_RATE);
    normalize_peak(&mut samples);
    samples
}

fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 1e-6 {
        let gain = NORMALIZE_PEAK / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes_i16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_i16_roundtrip() {
        let original = vec![0.0, 0.25, -0.25, 0.5];
        let bytes = wav_bytes_i16(&original, 16_000);

        let wave = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(wave.sample_rate, 16_000);
        assert_eq!(wave.samples.len(), 4);
        for (decoded, expected) in wave.samples.iter().zip(original.iter()) {
            assert!((decoded - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_wav_bytes(b"definitely not a wav file");
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_decode_empty_fails() {
        let bytes = wav_bytes_i16(&[], 16_000);
        assert!(matches!(decode_wav_bytes(&bytes), Err(AudioError::Empty)));
    }

    #[test]
    fn test_downmix_stereo() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_mono(&interleaved, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let resampled = resample_linear(&samples, 32_000, 16_000);
        assert!((resampled.len() as i64 - 500).abs() <= 1);
    }

    #[test]
    fn test_preprocess_normalizes_peak() {
        let wave = Waveform {
            samples: vec![0.1, -0.2, 0.05],
            sample_rate: EMBED_SAMPLE_RATE,
        };
        let processed = preprocess_for_embedding(&wave);
        let peak = processed.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.95).abs() < 1e-5);
    }

    #[test]
    fn test_preprocess_leaves_silence_alone() {
        let wave = Waveform {
            samples: vec![0.0; 100],
            sample_rate: 44_100,
        };
        let processed = preprocess_for_embedding(&wave);
        assert!(processed.iter().all(|&s| s == 0.0));
    }
}
