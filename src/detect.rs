//! Verification-gated mood detection.
//!
//! Loads the stored profile, verifies the speaker by embedding similarity,
//! and only then classifies the mood. Each call is stateless.

use crate::audio::{self, Waveform};
use crate::classify;
use crate::embedding::{EmbeddingError, VoiceEncoder};
use crate::features;
use crate::mood::Mood;
use crate::store::{ProfileStore, StoreError};
use crate::verify::{self, VerifyError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("no profile found for '{0}'")]
    ProfileNotFound(String),

    #[error("voice does not match the registered speaker")]
    VerificationFailed,

    #[error("stored profile for '{0}' has no mood centroids")]
    CorruptProfile(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("profile storage failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DetectionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(name) => DetectionError::ProfileNotFound(name),
            other => DetectionError::Store(other),
        }
    }
}

/// A successful detection. The similarity score stays internal; callers that
/// report rejections must not surface it.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub mood: Mood,
    pub similarity: f32,
}

/// Detect the mood of a new recording from a registered speaker.
pub fn detect(
    name: &str,
    recording: &Waveform,
    encoder: &mut dyn VoiceEncoder,
    store: &ProfileStore,
) -> Result<Detection, DetectionError> {
    let profile = store.load(name)?;

    let wave = audio::preprocess_for_embedding(recording);
    let candidate = encoder.embed(&wave)?;

    let verification = verify::verify(&candidate, &profile.embedding)?;
    if !verification.accepted {
        debug!("Rejected detection for '{}': speaker mismatch", name);
        return Err(DetectionError::VerificationFailed);
    }

    let feats = features::extract(&recording.samples, recording.sample_rate);
    let mood = classify::classify(&feats, &profile.centroids)
        .ok_or_else(|| DetectionError::CorruptProfile(name.to_string()))?;

    info!("Detected mood {} for '{}'", mood, name);
    Ok(Detection {
        mood,
        similarity: verification.score,
    })
}
