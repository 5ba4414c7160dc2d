//! Nearest-neighbour recognition against the gallery.

use crate::gallery::Gallery;
use crate::types::Descriptor;

/// Distance below which a probe is considered the same person.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Outcome of matching a probe descriptor against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    Known { name: String, distance: f32 },
    /// `distance` is the closest distance seen, `None` when nothing was comparable.
    Unknown { distance: Option<f32> },
}

impl Recognition {
    pub fn is_known(&self) -> bool {
        matches!(self, Recognition::Known { .. })
    }

    pub fn distance(&self) -> Option<f32> {
        match self {
            Recognition::Known { distance, .. } => Some(*distance),
            Recognition::Unknown { distance } => *distance,
        }
    }
}

/// Strategy for comparing a probe descriptor against the gallery.
pub trait Matcher {
    fn recognize(&self, probe: &Descriptor, gallery: &Gallery) -> Recognition;
}

/// Euclidean-distance matcher with a fixed threshold.
///
/// Scans the whole gallery in insertion order. On equal distances the earlier
/// entry wins.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub threshold: f32,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl Matcher for EuclideanMatcher {
    fn recognize(&self, probe: &Descriptor, gallery: &Gallery) -> Recognition {
        let mut best: Option<(f32, &str)> = None;

        for identity in gallery.iter() {
            let distance = match probe.distance(&identity.descriptor) {
                Ok(d) if d.is_finite() => d,
                Ok(d) => {
                    tracing::warn!(name = %identity.name, distance = d, "non-finite distance, skipping entry");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(name = %identity.name, error = %e, "skipping gallery entry");
                    continue;
                }
            };

            match best {
                Some((min, _)) if distance >= min => {}
                _ => best = Some((distance, identity.name.as_str())),
            }
        }

        match best {
            Some((distance, name)) if distance < self.threshold => Recognition::Known {
                name: name.to_string(),
                distance,
            },
            Some((distance, _)) => Recognition::Unknown {
                distance: Some(distance),
            },
            None => Recognition::Unknown { distance: None },
        }
    }
}
