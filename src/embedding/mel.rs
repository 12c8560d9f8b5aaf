//! Log-mel frontend for the ONNX speaker encoder.
//!
//! Converts a 16 kHz waveform into the 80-band log-mel frames the embedding
//! model expects (25 ms Hann window, 10 ms hop).

#[cfg(feature = "embedder")]
use super::EmbeddingError;
use std::f32::consts::PI;

#[cfg(feature = "embedder")]
use realfft::{RealFftPlanner, RealToComplex};
#[cfg(feature = "embedder")]
use std::sync::Arc;

/// Number of mel bands
pub const N_MELS: usize = 80;

/// FFT size
pub const N_FFT: usize = 512;

/// Window length in samples (25 ms at 16 kHz)
pub const WIN_LENGTH: usize = 400;

/// Hop length in samples (10 ms at 16 kHz)
pub const HOP_LENGTH: usize = 160;

/// Mel filterbank frequency range in Hz
const FMIN_HZ: f32 = 20.0;
const FMAX_HZ: f32 = 7600.0;

/// Offset added before the log for numerical stability
const LOG_OFFSET: f32 = 1e-6;

/// Log-mel spectrogram generator with a pre-planned FFT and pre-computed
/// filterbank and window.
#[cfg(feature = "embedder")]
pub struct LogMelFrontend {
    fft: Arc<dyn RealToComplex<f32>>,
    filterbank: Vec<Vec<f32>>,
    window: Vec<f32>,
    fft_input: Vec<f32>,
    fft_output: Vec<realfft::num_complex::Complex<f32>>,
}

#[cfg(feature = "embedder")]
impl LogMelFrontend {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(N_FFT);

        Self {
            fft,
            filterbank: mel_filterbank(N_MELS, N_FFT / 2 + 1, 16_000.0, FMIN_HZ, FMAX_HZ),
            window: hann_window(WIN_LENGTH),
            fft_input: vec![0.0; N_FFT],
            fft_output: vec![realfft::num_complex::Complex::new(0.0, 0.0); N_FFT / 2 + 1],
        }
    }

    /// Compute log-mel frames from 16 kHz mono samples.
    ///
    /// Returns `[frames][N_MELS]`.
    pub fn compute(&mut self, samples: &[f32]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if samples.is_empty() {
            return Err(EmbeddingError::InvalidAudio("empty audio".to_string()));
        }

        let n_frames = if samples.len() >= WIN_LENGTH {
            1 + (samples.len() - WIN_LENGTH) / HOP_LENGTH
        } else {
            1
        };

        let mut frames = Vec::with_capacity(n_frames);
        for frame_idx in 0..n_frames {
            let start = frame_idx * HOP_LENGTH;
            let end = (start + WIN_LENGTH).min(samples.len());

            self.fft_input.fill(0.0);
            for (slot, (&sample, &w)) in self
                .fft_input
                .iter_mut()
                .zip(samples[start..end].iter().zip(self.window.iter()))
            {
                *slot = sample * w;
            }

            self.fft
                .process(&mut self.fft_input, &mut self.fft_output)
                .map_err(|e| EmbeddingError::Inference(format!("FFT failed: {}", e)))?;

            let mel_frame: Vec<f32> = self
                .filterbank
                .iter()
                .map(|filter| {
                    let energy: f32 = filter
                        .iter()
                        .zip(self.fft_output.iter())
                        .map(|(&weight, c)| weight * (c.re * c.re + c.im * c.im))
                        .sum();
                    (energy + LOG_OFFSET).ln()
                })
                .collect();

            frames.push(mel_frame);
        }

        Ok(frames)
    }

    /// Mean linear-scale energy across all frames, used for silence rejection.
    pub fn mean_energy(frames: &[Vec<f32>]) -> f32 {
        frames
            .iter()
            .flat_map(|frame| frame.iter())
            .map(|v| v.exp())
            .sum::<f32>()
            / frames.len().max(1) as f32
    }
}

#[cfg(feature = "embedder")]
impl Default for LogMelFrontend {
    fn default() -> Self {
        Self::new()
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (len - 1) as f32).cos()))
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank: `n_mels` filters over `n_bins` FFT bins.
fn mel_filterbank(n_mels: usize, n_bins: usize, sample_rate: f32, fmin: f32, fmax: f32) -> Vec<Vec<f32>> {
    let mel_lo = hz_to_mel(fmin);
    let mel_hi = hz_to_mel(fmax);

    // n_mels + 2 edge points, evenly spaced on the mel scale, mapped to bins
    let bin_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| {
            let mel = mel_lo + (mel_hi - mel_lo) * i as f32 / (n_mels + 1) as f32;
            (n_bins as f32 - 1.0) * mel_to_hz(mel) / (sample_rate / 2.0)
        })
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (bin_points[m], bin_points[m + 1], bin_points[m + 2]);
            (0..n_bins)
                .map(|bin| {
                    let b = bin as f32;
                    if b >= left && b < center {
                        (b - left) / (center - left)
                    } else if b >= center && b <= right {
                        (right - b) / (right - center)
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [100.0, 440.0, 1000.0, 4000.0, 7600.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-2, "roundtrip failed for {} Hz", hz);
        }
    }

    #[test]
    fn test_hann_window_shape() {
        let window = hann_window(WIN_LENGTH);
        assert_eq!(window.len(), WIN_LENGTH);
        assert!(window[0].abs() < 1e-6);
        assert!((window[WIN_LENGTH / 2] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_filterbank_shape() {
        let filterbank = mel_filterbank(N_MELS, N_FFT / 2 + 1, 16_000.0, FMIN_HZ, FMAX_HZ);
        assert_eq!(filterbank.len(), N_MELS);
        for filter in &filterbank {
            assert_eq!(filter.len(), N_FFT / 2 + 1);
            assert!(filter.iter().all(|&w| w >= 0.0));
            assert!(filter.iter().sum::<f32>() > 0.0);
        }
    }

    #[cfg(feature = "embedder")]
    #[test]
    fn test_compute_dimensions() {
        let mut frontend = LogMelFrontend::new();
        let samples = vec![0.0; 16_000];
        let frames = frontend.compute(&samples).unwrap();

        assert_eq!(frames.len(), 1 + (16_000 - WIN_LENGTH) / HOP_LENGTH);
        assert!(frames.iter().all(|f| f.len() == N_MELS));
    }

    #[cfg(feature = "embedder")]
    #[test]
    fn test_silence_has_low_energy() {
        let mut frontend = LogMelFrontend::new();
        let frames = frontend.compute(&vec![0.0; 16_000]).unwrap();
        assert!(LogMelFrontend::mean_energy(&frames) < 1e-3);
    }

    #[cfg(feature = "embedder")]
    #[test]
    fn test_tone_has_energy() {
        let mut frontend = LogMelFrontend::new();
        let samples: Vec<f32> = (0..16_000)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 16_000.0).sin() * 0.5)
            .collect();
        let frames = frontend.compute(&samples).unwrap();
        assert!(LogMelFrontend::mean_energy(&frames) > 0.1);
    }

    #[cfg(feature = "embedder")]
    #[test]
    fn test_empty_audio_rejected() {
        let mut frontend = LogMelFrontend::new();
        assert!(matches!(
            frontend.compute(&[]),
            Err(EmbeddingError::InvalidAudio(_))
        ));
    }
}
