//! The fixed mood label set.
//!
//! Moods are carried structurally with every sample; the only place a label
//! is ever parsed out of a string is at the multipart/CLI boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A mood label. The declaration order is the canonical ordering used for
/// registration completeness checks and classifier tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mood {
    Neutral,
    Happy,
    Sad,
}

impl Mood {
    /// All moods in canonical order.
    pub const ALL: [Mood; 3] = [Mood::Neutral, Mood::Happy, Mood::Sad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "Neutral",
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
        }
    }

    /// Parse a mood from a field name prefix such as `Happy_2` or `neutral-1.wav`.
    ///
    /// Matching is case-insensitive on the label prefix; anything after the
    /// label is ignored. Returns `None` for field names that do not start
    /// with a known label.
    pub fn from_prefix(field: &str) -> Option<Mood> {
        Mood::ALL
            .into_iter()
            .find(|mood| starts_with_ignore_case(field, mood.as_str()))
    }
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| s.eq_ignore_ascii_case(mood.as_str()))
            .ok_or_else(|| format!("unknown mood: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        assert_eq!(Mood::ALL, [Mood::Neutral, Mood::Happy, Mood::Sad]);
        assert!(Mood::Neutral < Mood::Happy);
        assert!(Mood::Happy < Mood::Sad);
    }

    #[test]
    fn test_from_prefix() {
        assert_eq!(Mood::from_prefix("Neutral_1"), Some(Mood::Neutral));
        assert_eq!(Mood::from_prefix("happy-3.wav"), Some(Mood::Happy));
        assert_eq!(Mood::from_prefix("SAD_2"), Some(Mood::Sad));
        assert_eq!(Mood::from_prefix("angry_1"), None);
        assert_eq!(Mood::from_prefix(""), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Happy".parse::<Mood>().unwrap(), Mood::Happy);
        assert_eq!("neutral".parse::<Mood>().unwrap(), Mood::Neutral);
        assert!("excited".parse::<Mood>().is_err());
    }

    #[test]
    fn test_serialization_uses_label_names() {
        assert_eq!(serde_json::to_string(&Mood::Neutral).unwrap(), "\"Neutral\"");
        assert_eq!(serde_json::to_string(&Mood::Sad).unwrap(), "\"Sad\"");

        let happy: Mood = serde_json::from_str("\"Happy\"").unwrap();
        assert_eq!(happy, Mood::Happy);
    }
}
