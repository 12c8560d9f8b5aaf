//! Speaker identity embeddings.
//!
//! The `VoiceEncoder` trait is the seam to the pretrained model: a
//! preprocessed 16 kHz waveform goes in, a fixed-length vector comes out.
//! Everything else in the crate treats the encoder as opaque.

pub mod encoder;
pub mod mel;

pub use encoder::OnnxVoiceEncoder;

use std::path::PathBuf;
use thiserror::Error;

/// Embedding dimension the bundled encoder produces (WeSpeaker-style models
/// output 256-dim embeddings). Core logic never assumes this; it reads
/// `VoiceEncoder::dim` instead.
pub const EMBEDDING_DIM: usize = 256;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("embedding model not found at {0}")]
    ModelNotFound(PathBuf),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("invalid audio for embedding: {0}")]
    InvalidAudio(String),

    #[error("embedding support not compiled in (enable the 'embedder' feature)")]
    FeatureNotEnabled,
}

/// Maps a preprocessed waveform to a speaker identity embedding.
pub trait VoiceEncoder: Send {
    /// Compute the embedding for a 16 kHz mono waveform.
    fn embed(&mut self, samples: &[f32]) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality of the vectors this encoder produces.
    fn dim(&self) -> usize;
}

/// Component-wise mean of a set of embeddings.
pub fn mean_embedding(embeddings: &[Vec<f32>]) -> Result<Vec<f32>, EmbeddingError> {
    let first = embeddings
        .first()
        .ok_or_else(|| EmbeddingError::InvalidAudio("no embeddings to average".to_string()))?;
    let dim = first.len();

    let mut mean = vec![0.0f32; dim];
    for embedding in embeddings {
        if embedding.len() != dim {
            return Err(EmbeddingError::Inference(format!(
                "inconsistent embedding dimensions: {} vs {}",
                embedding.len(),
                dim
            )));
        }
        for (acc, &v) in mean.iter_mut().zip(embedding.iter()) {
            *acc += v;
        }
    }

    let n = embeddings.len() as f32;
    for acc in mean.iter_mut() {
        *acc /= n;
    }
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_embedding() {
        let embeddings = vec![vec![1.0, 2.0, 3.0], vec![3.0, 4.0, 5.0]];
        let mean = mean_embedding(&embeddings).unwrap();
        assert_eq!(mean, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_mean_embedding_single() {
        let embeddings = vec![vec![0.5, -0.5]];
        assert_eq!(mean_embedding(&embeddings).unwrap(), vec![0.5, -0.5]);
    }

    #[test]
    fn test_mean_embedding_empty_fails() {
        let result = mean_embedding(&[]);
        assert!(matches!(result, Err(EmbeddingError::InvalidAudio(_))));
    }

    #[test]
    fn test_mean_embedding_ragged_fails() {
        let embeddings = vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]];
        let result = mean_embedding(&embeddings);
        assert!(matches!(result, Err(EmbeddingError::Inference(_))));
    }
}
