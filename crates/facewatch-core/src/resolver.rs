//! Identity resolution: decides, once per recognition cycle, whether the
//! tracked face is known, should be registered as a new provisional identity,
//! or can take an operator-confirmed name.
//!
//! ```text
//! Idle ──track──▶ Unrecognized ──still long enough──▶ Provisional ──confirmed──▶ Known
//!                      │                                   ▲
//!                      └────────── matches gallery ────────┴──▶ Known
//! ```
//!
//! Any state returns to `Idle` on [`IdentityResolver::reset`] (face lost).

use crate::aggregator::RollingAggregator;
use crate::external::{NameExchange, RecognitionState, NAME_NOT_SET};
use crate::gallery::Gallery;
use crate::recognizer::{EuclideanMatcher, Matcher, Recognition};
use crate::stability::StabilityTracker;
use crate::types::{Descriptor, Position};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Recognition cycles a face must stay still (exclusive) before registration.
pub const DEFAULT_STILL_THRESHOLD: u32 = 3;

/// Auto-generated names end with the gender label ("male" / "female").
pub const PROVISIONAL_SUFFIX: &str = "male";

/// Name reported when the face has neither a recognized nor a matched name.
pub const UNKNOWN_NAME: &str = "unKnown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Idle,
    Unrecognized,
    /// Registered or matched under an auto-generated name.
    Provisional,
    Known,
}

/// What a recognition cycle decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Unknown face that has not been still long enough yet.
    Waiting {
        still_count: u32,
        distance: Option<f32>,
    },
    Registered {
        name: String,
    },
    Matched {
        name: String,
        distance: f32,
    },
    Reconciled {
        from: String,
        to: String,
    },
    NoFace,
}

impl Resolution {
    /// Whether the gallery was mutated and needs saving.
    pub fn gallery_changed(&self) -> bool {
        matches!(
            self,
            Resolution::Registered { .. } | Resolution::Reconciled { .. }
        )
    }
}

/// Whether `name` still looks like an auto-generated name awaiting confirmation.
///
/// Any confirmed name that does not end in [`PROVISIONAL_SUFFIX`] is final.
pub fn is_provisional(name: &str) -> bool {
    name.ends_with(PROVISIONAL_SUFFIX)
}

/// `YYYYMMDD_HHMMSS_<age>_<gender>` in local time.
pub fn provisional_name(now: &DateTime<Local>, age: Option<u32>, gender: Option<&str>) -> String {
    let age = age.map_or_else(|| "unknown".to_string(), |a| a.to_string());
    format!(
        "{}_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        age,
        gender.unwrap_or("unknown")
    )
}

#[derive(Debug, Clone)]
pub struct IdentityResolver<M: Matcher = EuclideanMatcher> {
    matcher: M,
    tracker: StabilityTracker,
    still_threshold: u32,
    state: TrackingState,
    /// Name of the last gallery match.
    result_name: Option<String>,
    /// Name shown and uploaded for the face.
    recognized_name: Option<String>,
    has_exact_name: bool,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(
            EuclideanMatcher::default(),
            StabilityTracker::default(),
            DEFAULT_STILL_THRESHOLD,
        )
    }
}

impl<M: Matcher> IdentityResolver<M> {
    pub fn new(matcher: M, tracker: StabilityTracker, still_threshold: u32) -> Self {
        Self {
            matcher,
            tracker,
            still_threshold,
            state: TrackingState::Idle,
            result_name: None,
            recognized_name: None,
            has_exact_name: false,
        }
    }

    /// Fast-tick update: a face is in view.
    ///
    /// Stillness is only measured between recognition cycles, so the tick
    /// position is not fed to the tracker.
    pub fn track(&mut self) {
        if self.state == TrackingState::Idle {
            self.state = TrackingState::Unrecognized;
        }
    }

    /// Run one recognition cycle for the face at `position`.
    pub async fn resolve(
        &mut self,
        position: Position,
        descriptor: &Descriptor,
        gallery: &mut Gallery,
        aggregator: &RollingAggregator,
        exchange: &dyn NameExchange,
        now: &DateTime<Local>,
    ) -> Resolution {
        let recognition = self.matcher.recognize(descriptor, gallery);
        tracing::debug!(?recognition, "recognition");

        match recognition {
            Recognition::Unknown { distance } => {
                self.on_unknown(position, descriptor, distance, gallery, aggregator, now)
            }
            Recognition::Known { name, distance } => {
                self.on_known(name, distance, descriptor, gallery, exchange)
                    .await
            }
        }
    }

    /// The recognition pass found no face.
    pub fn face_missing(&mut self) -> Resolution {
        self.tracker.reset_count();
        self.result_name = None;
        self.state = TrackingState::Unrecognized;
        Resolution::NoFace
    }

    /// Face lost: forget everything about it.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.state = TrackingState::Idle;
        self.result_name = None;
        self.recognized_name = None;
        self.has_exact_name = false;
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn recognition_state(&self) -> RecognitionState {
        match self.state {
            TrackingState::Provisional | TrackingState::Known => RecognitionState::Recognized,
            TrackingState::Idle | TrackingState::Unrecognized => RecognitionState::Unrecognized,
        }
    }

    pub fn result_name(&self) -> Option<&str> {
        self.result_name.as_deref()
    }

    pub fn recognized_name(&self) -> Option<&str> {
        self.recognized_name.as_deref()
    }

    pub fn has_exact_name(&self) -> bool {
        self.has_exact_name
    }

    pub fn still_count(&self) -> u32 {
        self.tracker.still_count()
    }

    /// Recognized name, else last match, else [`UNKNOWN_NAME`].
    pub fn display_name(&self) -> &str {
        self.recognized_name
            .as_deref()
            .or(self.result_name.as_deref())
            .unwrap_or(UNKNOWN_NAME)
    }

    fn on_unknown(
        &mut self,
        position: Position,
        descriptor: &Descriptor,
        distance: Option<f32>,
        gallery: &mut Gallery,
        aggregator: &RollingAggregator,
        now: &DateTime<Local>,
    ) -> Resolution {
        self.state = TrackingState::Unrecognized;

        let still_count = self
            .tracker
            .observe(position, aggregator.median_age().is_some());
        if still_count <= self.still_threshold {
            return Resolution::Waiting {
                still_count,
                distance,
            };
        }

        // The gender suffix is what marks the entry as provisional, so a face
        // without one cannot be registered yet.
        let Some(gender) = aggregator.mode_gender() else {
            tracing::debug!(still_count, "holding registration until gender is estimated");
            return Resolution::Waiting {
                still_count,
                distance,
            };
        };

        let name = provisional_name(now, aggregator.median_age(), Some(gender));
        if let Err(e) = gallery.insert(descriptor.clone(), &name) {
            tracing::error!(name = %name, error = %e, "failed to register face");
            return Resolution::Waiting {
                still_count,
                distance,
            };
        }

        tracing::info!(name = %name, still_count, "registered provisional identity");
        self.tracker.reset_count();
        self.recognized_name = Some(name.clone());
        self.has_exact_name = false;
        self.state = TrackingState::Provisional;
        Resolution::Registered { name }
    }

    async fn on_known(
        &mut self,
        name: String,
        distance: f32,
        descriptor: &Descriptor,
        gallery: &mut Gallery,
        exchange: &dyn NameExchange,
    ) -> Resolution {
        self.result_name = Some(name.clone());
        if !self.has_exact_name {
            self.recognized_name = Some(name.clone());
        }

        if !is_provisional(&name) {
            self.state = TrackingState::Known;
            return Resolution::Matched { name, distance };
        }

        self.state = TrackingState::Provisional;
        match self.reconcile(&name, descriptor, gallery, exchange).await {
            Some(confirmed) => Resolution::Reconciled {
                from: name,
                to: confirmed,
            },
            None => Resolution::Matched { name, distance },
        }
    }

    /// Apply a pending operator-confirmed name to the provisional entry.
    ///
    /// Returns the confirmed name when the gallery entry was renamed.
    async fn reconcile(
        &mut self,
        provisional: &str,
        descriptor: &Descriptor,
        gallery: &mut Gallery,
        exchange: &dyn NameExchange,
    ) -> Option<String> {
        let pending = match exchange.pending_name().await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "confirmed-name lookup failed");
                return None;
            }
        };

        let confirmed = pending.trim();
        if confirmed.is_empty() || confirmed == NAME_NOT_SET {
            tracing::debug!(provisional, "no confirmed name yet");
            return None;
        }

        if let Err(e) = gallery.rename(provisional, descriptor.clone(), confirmed) {
            tracing::warn!(provisional, confirmed, error = %e, "rename failed");
            return None;
        }

        tracing::info!(from = provisional, to = confirmed, "identity confirmed");
        self.has_exact_name = true;
        self.recognized_name = Some(confirmed.to_string());
        self.state = TrackingState::Known;

        if let Err(e) = exchange.clear().await {
            tracing::warn!(error = %e, "failed to clear confirmed name");
        }

        Some(confirmed.to_string())
    }
}
