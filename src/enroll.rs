//! Profile registration pipeline.
//!
//! Reduces mood-labeled recordings to a stored profile: one tone centroid
//! per mood, plus an identity embedding averaged from the Neutral samples
//! only.

use crate::audio::{self, Waveform};
use crate::embedding::{self, EmbeddingError, VoiceEncoder};
use crate::features;
use crate::mood::Mood;
use crate::profile::{MoodCentroid, Profile};
use crate::store::{ProfileStore, StoreError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("a profile named '{0}' already exists")]
    DuplicateName(String),

    #[error("no samples provided for mood: {0}")]
    MissingMood(Mood),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("profile storage failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RegistrationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(name) => RegistrationError::DuplicateName(name),
            other => RegistrationError::Store(other),
        }
    }
}

/// One mood-labeled recording submitted at registration time.
#[derive(Debug, Clone)]
pub struct MoodSample {
    pub mood: Mood,
    pub audio: Waveform,
}

impl MoodSample {
    pub fn new(mood: Mood, audio: Waveform) -> Self {
        Self { mood, audio }
    }
}

/// Build and persist a profile from labeled samples.
///
/// Every mood in the fixed label set needs at least one sample; the first
/// missing mood (in canonical order) fails the whole registration and
/// nothing is persisted. Only Neutral samples feed the identity embedding.
pub fn register(
    name: &str,
    samples: &[MoodSample],
    encoder: &mut dyn VoiceEncoder,
    store: &ProfileStore,
) -> Result<Profile, RegistrationError> {
    // Fast-path duplicate check; the store's atomic create below is the
    // authoritative one.
    if store.exists(name) {
        return Err(RegistrationError::DuplicateName(name.to_string()));
    }

    let mut centroids = BTreeMap::new();
    let mut neutral_embeddings = Vec::new();

    for mood in Mood::ALL {
        let group: Vec<&MoodSample> = samples.iter().filter(|s| s.mood == mood).collect();
        if group.is_empty() {
            return Err(RegistrationError::MissingMood(mood));
        }

        let mut pitch_sum = 0.0f32;
        let mut energy_sum = 0.0f32;
        for sample in &group {
            let feats = features::extract(&sample.audio.samples, sample.audio.sample_rate);
            pitch_sum += feats.pitch_hz;
            energy_sum += feats.energy_rms;

            if mood == Mood::Neutral {
                let wave = audio::preprocess_for_embedding(&sample.audio);
                neutral_embeddings.push(encoder.embed(&wave)?);
            }
        }

        let n = group.len() as f32;
        centroids.insert(
            mood,
            MoodCentroid {
                pitch_hz: pitch_sum / n,
                energy_rms: energy_sum / n,
            },
        );
    }

    let identity = embedding::mean_embedding(&neutral_embeddings)?;
    let profile = Profile::new(name.to_string(), identity, centroids);
    store.create(&profile)?;

    info!(
        "Registered '{}' with {} samples ({}-dim embedding)",
        name,
        samples.len(),
        profile.embedding.len()
    );
    Ok(profile)
}
