//! Speaker profile data model.

use crate::mood::Mood;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current schema version for persisted profile blobs
pub const SCHEMA_VERSION: u32 = 1;

/// Mean (pitch, energy) point representing one mood class for one speaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodCentroid {
    /// Mean voiced pitch in Hz
    pub pitch_hz: f32,
    /// Mean RMS amplitude
    pub energy_rms: f32,
}

/// A registered speaker's profile: identity embedding plus one tone centroid
/// per mood. Created once at registration and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique speaker name (store key)
    pub name: String,
    /// Identity embedding, averaged from the Neutral samples only
    pub embedding: Vec<f32>,
    /// One centroid per mood; registration guarantees full coverage
    pub centroids: BTreeMap<Mood, MoodCentroid>,
    /// Creation timestamp (Unix epoch seconds)
    pub created_at: i64,
}

impl Profile {
    pub fn new(
        name: String,
        embedding: Vec<f32>,
        centroids: BTreeMap<Mood, MoodCentroid>,
    ) -> Self {
        Self {
            name,
            embedding,
            centroids,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
