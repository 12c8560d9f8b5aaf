//! Speaker verification by cosine similarity against a fixed threshold.

use thiserror::Error;
use tracing::debug;

/// Cosine similarity at or above which a candidate is accepted as the
/// registered speaker. Fixed; no per-profile tuning.
pub const SIMILARITY_THRESHOLD: f32 = 0.84;

/// Norms at or below this are treated as zero.
const MIN_NORM: f32 = 1e-10;

#[derive(Debug, Error, PartialEq)]
pub enum VerifyError {
    #[error("embedding has zero norm; similarity is undefined")]
    DegenerateEmbedding,

    #[error("embedding dimensions differ: {candidate} vs {reference}")]
    DimensionMismatch { candidate: usize, reference: usize },
}

/// Outcome of a verification check.
#[derive(Debug, Clone, Copy)]
pub struct Verification {
    pub accepted: bool,
    pub score: f32,
}

/// Cosine similarity between two embeddings.
///
/// Fails rather than divide by a zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, VerifyError> {
    if a.len() != b.len() {
        return Err(VerifyError::DimensionMismatch {
            candidate: a.len(),
            reference: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a <= MIN_NORM || norm_b <= MIN_NORM {
        return Err(VerifyError::DegenerateEmbedding);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Score a candidate embedding against a stored reference embedding.
pub fn verify(candidate: &[f32], reference: &[f32]) -> Result<Verification, VerifyError> {
    let score = cosine_similarity(candidate, reference)?;
    let accepted = score >= SIMILARITY_THRESHOLD;
    debug!(
        "speaker similarity {:.4}, threshold {:.2}, accepted: {}",
        score, SIMILARITY_THRESHOLD, accepted
    );
    Ok(Verification { accepted, score })
}
