use vista_core::Match;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keep-threshold policy: a match survives when
/// `distance <= max(ratio * min_dist, floor)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterPolicy {
    pub ratio: f32,
    pub floor: f32,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            ratio: 1.5,
            floor: 0.02,
        }
    }
}

/// Smallest and largest distance over a match set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBounds {
    pub min: f32,
    pub max: f32,
}

impl DistanceBounds {
    /// Bounds seeded from the data itself; `None` for an empty set.
    pub fn from_matches(matches: &[Match]) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }
        let (min, max) = matches
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), m| {
                (lo.min(m.distance), hi.max(m.distance))
            });
        Some(Self { min, max })
    }
}

impl FilterPolicy {
    pub fn threshold(&self, min_dist: f32) -> f32 {
        (self.ratio * min_dist).max(self.floor)
    }

    /// Order-preserving subset of `matches` passing the policy
    pub fn apply(&self, matches: &[Match]) -> Vec<Match> {
        let Some(bounds) = DistanceBounds::from_matches(matches) else {
            return Vec::new();
        };
        let threshold = self.threshold(bounds.min);
        let kept: Vec<Match> = matches
            .iter()
            .filter(|m| m.distance <= threshold)
            .copied()
            .collect();

        log::debug!(
            "distance bounds [{}, {}], threshold {}, kept {}/{}",
            bounds.min,
            bounds.max,
            threshold,
            kept.len(),
            matches.len()
        );
        kept
    }
}
