//! Shared helpers for tests: a deterministic fake encoder, synthesized
//! waveforms, and WAV/multipart builders for exercising the HTTP surface.

use crate::audio::Waveform;
use crate::embedding::{EmbeddingError, VoiceEncoder};
use crate::enroll::MoodSample;
use crate::mood::Mood;
use std::f32::consts::PI;
use std::io::Cursor;

/// Deterministic encoder double: returns canned embeddings and counts calls.
pub struct FakeEncoder {
    embeddings: Vec<Vec<f32>>,
    pub calls: usize,
}

impl FakeEncoder {
    /// Always return the same embedding.
    pub fn returning(embedding: Vec<f32>) -> Self {
        Self {
            embeddings: vec![embedding],
            calls: 0,
        }
    }

    /// Return the given embeddings in order, cycling when exhausted.
    pub fn cycling(embeddings: Vec<Vec<f32>>) -> Self {
        assert!(!embeddings.is_empty());
        Self {
            embeddings,
            calls: 0,
        }
    }
}

impl VoiceEncoder for FakeEncoder {
    fn embed(&mut self, _samples: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
        let embedding = self.embeddings[self.calls % self.embeddings.len()].clone();
        self.calls += 1;
        Ok(embedding)
    }

    fn dim(&self) -> usize {
        self.embeddings[0].len()
    }
}

/// One second and a bit of a pure tone, enough for several analysis frames.
pub fn sine_wave(freq: f32, sample_rate: u32, duration_ms: u32, amplitude: f32) -> Waveform {
    let num_samples = (sample_rate * duration_ms / 1000) as usize;
    let samples = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * PI * freq * t).sin() * amplitude
        })
        .collect();
    Waveform {
        samples,
        sample_rate,
    }
}

/// A mood-labeled one-second tone at 16 kHz.
pub fn sine_sample(mood: Mood, freq: f32) -> MoodSample {
    MoodSample::new(mood, sine_wave(freq, 16_000, 1000, 0.4))
}

/// Encode samples as an in-memory 16-bit mono WAV.
pub fn wav_bytes(wave: &Waveform) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: wave.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in &wave.samples {
            writer
                .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Boundary used by [`MultipartBuilder`].
pub const TEST_BOUNDARY: &str = "moodgate-test-boundary";

/// Minimal multipart/form-data body builder for handler tests.
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", TEST_BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, field: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", TEST_BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", TEST_BOUNDARY).as_bytes());
        self.body
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", TEST_BOUNDARY)
    }
}
