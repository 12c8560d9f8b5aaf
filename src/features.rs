//! Acoustic tone features: mean voiced pitch and mean RMS energy.
//!
//! Frame and hop sizes are fixed constants shared by registration and
//! detection so features stay comparable across the two paths.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

/// Analysis frame size in samples (~64ms at 16kHz)
pub const FRAME_SIZE: usize = 1024;

/// Hop size between frames (50% overlap)
pub const HOP_SIZE: usize = 512;

/// Minimum pitch in Hz (human vocal range)
const MIN_PITCH_HZ: f32 = 50.0;

/// Maximum pitch in Hz (human vocal range)
const MAX_PITCH_HZ: f32 = 500.0;

/// Power threshold for pitch detection
const POWER_THRESHOLD: f32 = 0.8;

/// Clarity threshold for pitch detection
const CLARITY_THRESHOLD: f32 = 0.5;

/// Scalar tone descriptors for one recording. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticFeatures {
    /// Mean fundamental frequency over voiced frames, in Hz. Zero when no
    /// frame carries a detectable pitch.
    pub pitch_hz: f32,
    /// Mean per-frame RMS amplitude over all frames.
    pub energy_rms: f32,
}

/// Extract tone features from a mono waveform.
///
/// Pitch is the arithmetic mean of per-frame McLeod estimates over frames
/// with a detectable pitch in the 50-500 Hz range; unvoiced input yields
/// exactly 0. Energy is the mean per-frame RMS over all frames. Input shorter
/// than one frame falls back to whole-buffer RMS with pitch 0.
pub fn extract(samples: &[f32], sample_rate: u32) -> AcousticFeatures {
    if samples.len() < FRAME_SIZE {
        return AcousticFeatures {
            pitch_hz: 0.0,
            energy_rms: rms(samples),
        };
    }

    let mut detector = McLeodDetector::new(FRAME_SIZE, FRAME_SIZE / 2);
    let mut pitch_sum = 0.0f32;
    let mut voiced_frames = 0usize;
    let mut energy_sum = 0.0f32;
    let mut total_frames = 0usize;

    let mut start = 0;
    while start + FRAME_SIZE <= samples.len() {
        let frame = &samples[start..start + FRAME_SIZE];
        total_frames += 1;
        energy_sum += rms(frame);

        if let Some(pitch) = detector.get_pitch(
            frame,
            sample_rate as usize,
            POWER_THRESHOLD,
            CLARITY_THRESHOLD,
        ) {
            if pitch.frequency >= MIN_PITCH_HZ && pitch.frequency <= MAX_PITCH_HZ {
                pitch_sum += pitch.frequency;
                voiced_frames += 1;
            }
        }

        start += HOP_SIZE;
    }

    let pitch_hz = if voiced_frames > 0 {
        pitch_sum / voiced_frames as f32
    } else {
        0.0
    };

    AcousticFeatures {
        pitch_hz,
        energy_rms: energy_sum / total_frames as f32,
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn generate_sine(freq: f32, sample_rate: u32, duration_ms: u32, amplitude: f32) -> Vec<f32> {
        let num_samples = (sample_rate * duration_ms / 1000) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * freq * t).sin() * amplitude
            })
            .collect()
    }

    #[test]
    fn test_voiced_input_has_positive_pitch() {
        let samples = generate_sine(200.0, 16_000, 1000, 0.5);
        let features = extract(&samples, 16_000);

        assert!(features.pitch_hz > 0.0);
        assert!(
            (features.pitch_hz - 200.0).abs() < 20.0,
            "expected pitch near 200 Hz, got {}",
            features.pitch_hz
        );
    }

    #[test]
    fn test_silence_has_zero_pitch() {
        let samples = vec![0.0; 16_000];
        let features = extract(&samples, 16_000);

        assert_eq!(features.pitch_hz, 0.0);
        assert!(features.energy_rms < 1e-6);
    }

    #[test]
    fn test_energy_tracks_amplitude() {
        let quiet = extract(&generate_sine(200.0, 16_000, 500, 0.1), 16_000);
        let loud = extract(&generate_sine(200.0, 16_000, 500, 0.5), 16_000);

        assert!(loud.energy_rms > quiet.energy_rms * 3.0);
        // RMS of a sine is amplitude / sqrt(2)
        assert!((loud.energy_rms - 0.5 / 2.0f32.sqrt()).abs() < 0.05);
    }

    #[test]
    fn test_short_input_falls_back_to_buffer_rms() {
        let samples = vec![0.5; 100];
        let features = extract(&samples, 16_000);

        assert_eq!(features.pitch_hz, 0.0);
        assert!((features.energy_rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic() {
        let samples = generate_sine(150.0, 16_000, 800, 0.4);
        let a = extract(&samples, 16_000);
        let b = extract(&samples, 16_000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pitch_outside_vocal_range_is_unvoiced() {
        // 1200 Hz is above the vocal-range gate
        let samples = generate_sine(1200.0, 16_000, 500, 0.5);
        let features = extract(&samples, 16_000);
        assert_eq!(features.pitch_hz, 0.0);
    }
}
