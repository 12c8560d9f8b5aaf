//! ONNX-based voice encoder.
//!
//! Runs a pretrained speaker-embedding model (WeSpeaker-style, log-mel input,
//! 256-dim output) through ONNX Runtime. The model file is supplied by
//! configuration and loaded once; the session is reused for every call.

use super::{EmbeddingError, VoiceEncoder, EMBEDDING_DIM};
use std::path::Path;

#[cfg(feature = "embedder")]
use super::mel::LogMelFrontend;
#[cfg(feature = "embedder")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};

/// Minimum input length for a reliable embedding (1 s at 16 kHz)
#[cfg(feature = "embedder")]
const MIN_EMBED_SAMPLES: usize = 16_000;

/// Mean mel-frame energy below which audio is treated as silence
#[cfg(feature = "embedder")]
const MIN_MEL_ENERGY: f32 = 4.5e-5;

/// Speaker encoder backed by an ONNX Runtime session.
#[cfg(feature = "embedder")]
pub struct OnnxVoiceEncoder {
    session: Session,
    frontend: LogMelFrontend,
}

#[cfg(feature = "embedder")]
impl OnnxVoiceEncoder {
    /// Load the encoder from an ONNX model file.
    pub fn new(model_path: &Path, n_threads: usize) -> Result<Self, EmbeddingError> {
        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?
            .with_intra_threads(n_threads)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        tracing::info!("Loaded voice encoder model from {:?}", model_path);

        Ok(Self {
            session,
            frontend: LogMelFrontend::new(),
        })
    }
}

#[cfg(feature = "embedder")]
impl VoiceEncoder for OnnxVoiceEncoder {
    fn embed(&mut self, samples: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
        if samples.len() < MIN_EMBED_SAMPLES {
            return Err(EmbeddingError::InvalidAudio(format!(
                "audio too short for embedding: {} samples (min: {})",
                samples.len(),
                MIN_EMBED_SAMPLES
            )));
        }

        let mel = self.frontend.compute(samples)?;
        if LogMelFrontend::mean_energy(&mel) < MIN_MEL_ENERGY {
            return Err(EmbeddingError::InvalidAudio(
                "audio is too quiet for a reliable embedding".to_string(),
            ));
        }

        // Model input shape: [batch, frames, mels]
        let n_frames = mel.len();
        let n_mels = mel[0].len();
        let input_data: Vec<f32> = mel.iter().flat_map(|frame| frame.iter().copied()).collect();

        let input_tensor = Value::from_array(([1usize, n_frames, n_mels], input_data))
            .map_err(|e: ort::Error| EmbeddingError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        // Output shape: [batch, embedding_dim] = [1, 256]
        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("no output tensor".to_string()))?;

        let tensor = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let embedding: Vec<f32> = tensor.1.iter().copied().collect();

        if embedding.len() != EMBEDDING_DIM {
            tracing::warn!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                EMBEDDING_DIM
            );
        }

        Ok(embedding)
    }

    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }
}

// Stub implementation when the feature is not enabled
#[cfg(not(feature = "embedder"))]
pub struct OnnxVoiceEncoder;

#[cfg(not(feature = "embedder"))]
impl OnnxVoiceEncoder {
    pub fn new(_model_path: &Path, _n_threads: usize) -> Result<Self, EmbeddingError> {
        Err(EmbeddingError::FeatureNotEnabled)
    }
}

#[cfg(not(feature = "embedder"))]
impl VoiceEncoder for OnnxVoiceEncoder {
    fn embed(&mut self, _samples: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::FeatureNotEnabled)
    }

    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "embedder")]
    #[test]
    fn test_model_not_found() {
        let result = OnnxVoiceEncoder::new(Path::new("/nonexistent/model.onnx"), 1);
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }

    #[cfg(not(feature = "embedder"))]
    #[test]
    fn test_stub_encoder() {
        let result = OnnxVoiceEncoder::new(Path::new("model.onnx"), 1);
        assert!(matches!(result, Err(EmbeddingError::FeatureNotEnabled)));
    }
}
