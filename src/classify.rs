//! Nearest-centroid mood classification.
//!
//! Distances are computed in raw units (pitch in Hz, energy as RMS
//! amplitude) with no normalization, matching the behavior the stored
//! centroids were collected under. Energy is orders of magnitude smaller
//! than pitch and therefore contributes very little to the distance; this
//! is documented legacy behavior, not an oversight to fix here.

use crate::features::AcousticFeatures;
use crate::mood::Mood;
use crate::profile::MoodCentroid;
use std::collections::BTreeMap;

/// Pick the mood whose centroid is nearest to `features` by Euclidean
/// distance. Equidistant centroids break ties toward the mood earliest in
/// the canonical ordering (Neutral, Happy, Sad). Returns `None` only for an
/// empty centroid map.
pub fn classify(
    features: &AcousticFeatures,
    centroids: &BTreeMap<Mood, MoodCentroid>,
) -> Option<Mood> {
    let mut best: Option<(Mood, f32)> = None;

    // BTreeMap iterates in Mood's canonical order, so strict `<` keeps the
    // earliest mood on a tie.
    for (&mood, centroid) in centroids {
        let d = distance(features, centroid);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((mood, d)),
        }
    }

    best.map(|(mood, _)| mood)
}

fn distance(features: &AcousticFeatures, centroid: &MoodCentroid) -> f32 {
    let dp = features.pitch_hz - centroid.pitch_hz;
    let de = features.energy_rms - centroid.energy_rms;
    (dp * dp + de * de).sqrt()
}
