//! Flat-file persistence for speaker profiles.
//!
//! Each registered name owns one directory under the store root with two
//! JSON blobs: the identity embedding and the per-mood tone centroids.
//! Creation is atomic with respect to the existence check: the profile
//! directory itself is created with `create_dir`, so two concurrent
//! registrations of the same name cannot both succeed.

use crate::mood::Mood;
use crate::profile::{MoodCentroid, Profile, SCHEMA_VERSION};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const EMBEDDING_FILE: &str = "voice_embedding.json";
const TONE_FILE: &str = "tone_features.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a profile named '{0}' already exists")]
    AlreadyExists(String),

    #[error("no profile found for '{0}'")]
    NotFound(String),

    #[error("invalid profile name '{0}'")]
    InvalidName(String),

    #[error("profile storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read or write profile data: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingBlob {
    schema_version: u32,
    name: String,
    created_at: i64,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ToneBlob {
    schema_version: u32,
    centroids: BTreeMap<Mood, MoodCentroid>,
}

/// Directory-backed profile store.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Check whether a profile exists under `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.profile_dir(name)
            .map(|dir| dir.is_dir())
            .unwrap_or(false)
    }

    /// Persist a new profile. Create-only: fails with `AlreadyExists` if the
    /// name is taken, and leaves nothing behind if any blob write fails.
    pub fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        let dir = self.profile_dir(&profile.name)?;
        fs::create_dir_all(&self.root)?;

        // The directory is the existence token; create_dir is atomic.
        if let Err(e) = fs::create_dir(&dir) {
            if e.kind() == io::ErrorKind::AlreadyExists {
                return Err(StoreError::AlreadyExists(profile.name.clone()));
            }
            return Err(e.into());
        }

        let result = self.write_blobs(&dir, profile);
        if result.is_err() {
            let _ = fs::remove_dir_all(&dir);
        }
        result
    }

    fn write_blobs(&self, dir: &Path, profile: &Profile) -> Result<(), StoreError> {
        write_json(
            &dir.join(EMBEDDING_FILE),
            &EmbeddingBlob {
                schema_version: SCHEMA_VERSION,
                name: profile.name.clone(),
                created_at: profile.created_at,
                embedding: profile.embedding.clone(),
            },
        )?;
        write_json(
            &dir.join(TONE_FILE),
            &ToneBlob {
                schema_version: SCHEMA_VERSION,
                centroids: profile.centroids.clone(),
            },
        )?;

        info!("Saved profile '{}' to {:?}", profile.name, dir);
        Ok(())
    }

    /// Load a stored profile by name.
    pub fn load(&self, name: &str) -> Result<Profile, StoreError> {
        let dir = self.profile_dir(name)?;
        if !dir.is_dir() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let embedding: EmbeddingBlob = read_json(&dir.join(EMBEDDING_FILE))?;
        let tone: ToneBlob = read_json(&dir.join(TONE_FILE))?;

        if embedding.schema_version != SCHEMA_VERSION || tone.schema_version != SCHEMA_VERSION {
            warn!(
                "Profile '{}' schema version mismatch: {}/{} vs {}, may need migration",
                name, embedding.schema_version, tone.schema_version, SCHEMA_VERSION
            );
        }

        Ok(Profile {
            name: name.to_string(),
            embedding: embedding.embedding,
            centroids: tone.centroids,
            created_at: embedding.created_at,
        })
    }
}

/// Reject names that would escape the store root or collapse to the same
/// location as another name.
fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Atomic JSON write: temp file, permissions, rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content)?;

    // Embeddings are somewhat sensitive; keep them owner-readable only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_profile(name: &str) -> Profile {
        let mut centroids = BTreeMap::new();
        for (mood, pitch) in [
            (Mood::Neutral, 150.0),
            (Mood::Happy, 220.0),
            (Mood::Sad, 110.0),
        ] {
            centroids.insert(
                mood,
                MoodCentroid {
                    pitch_hz: pitch,
                    energy_rms: 0.05,
                },
            );
        }
        Profile::new(name.to_string(), vec![0.25; 8], centroids)
    }

    #[test]
    fn test_create_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());

        let profile = test_profile("alice");
        store.create(&profile).unwrap();

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded.name, "alice");
        assert_eq!(loaded.embedding, profile.embedding);
        assert_eq!(loaded.centroids, profile.centroids);
        assert_eq!(loaded.created_at, profile.created_at);
    }

    #[test]
    fn test_exists() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());

        assert!(!store.exists("alice"));
        store.create(&test_profile("alice")).unwrap();
        assert!(store.exists("alice"));
    }

    #[test]
    fn test_duplicate_create_fails_and_preserves_original() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());

        let original = test_profile("alice");
        store.create(&original).unwrap();

        let mut second = test_profile("alice");
        second.embedding = vec![9.0; 8];
        let result = store.create(&second);
        assert!(matches!(result, Err(StoreError::AlreadyExists(name)) if name == "alice"));

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded.embedding, original.embedding);
    }

    #[test]
    fn test_load_unknown_name() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());

        let result = store.load("nobody");
        assert!(matches!(result, Err(StoreError::NotFound(name)) if name == "nobody"));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());

        for bad in ["", "a/b", "a\\b", "..", "x..y"] {
            let result = store.load(bad);
            assert!(
                matches!(result, Err(StoreError::InvalidName(_))),
                "expected InvalidName for {:?}",
                bad
            );
            assert!(!store.exists(bad));
        }
    }

    #[test]
    fn test_profile_layout_on_disk() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());
        store.create(&test_profile("alice")).unwrap();

        let profile_dir = dir.path().join("alice");
        assert!(profile_dir.join("voice_embedding.json").is_file());
        assert!(profile_dir.join("tone_features.json").is_file());
    }
}
