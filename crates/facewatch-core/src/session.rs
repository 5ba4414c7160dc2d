//! Session driver: the per-tick loop body.
//!
//! Every tick feeds the rolling aggregator from the lightweight detector pass.
//! When both the upload and the recognition intervals have elapsed, the same
//! tick also runs the heavier recognition pass, persists any gallery change
//! and uploads the smoothed attributes. A tick with no face emits a single
//! `lost` record and resets the session.
//!
//! `tick` takes `&mut self`, so a caller can never run two ticks (or two
//! recognition passes) against the same session at once.

use crate::aggregator::{Representatives, RollingAggregator};
use crate::external::{
    Detector, GalleryPersistence, NameExchange, PersistenceError, RecognitionState, UploadRecord,
    UploadSink,
};
use crate::frame::Frame;
use crate::gallery::Gallery;
use crate::recognizer::EuclideanMatcher;
use crate::resolver::{IdentityResolver, Resolution, TrackingState};
use crate::stability::StabilityTracker;
use crate::types::Detection;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("interval must be a positive number of seconds")]
    InvalidInterval,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub window_size: usize,
    pub match_threshold: f32,
    pub movement_threshold: f32,
    pub still_threshold: u32,
    pub upload_interval: Duration,
    pub recognition_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: crate::aggregator::DEFAULT_WINDOW_SIZE,
            match_threshold: crate::recognizer::DEFAULT_MATCH_THRESHOLD,
            movement_threshold: crate::stability::DEFAULT_MOVEMENT_THRESHOLD,
            still_threshold: crate::resolver::DEFAULT_STILL_THRESHOLD,
            upload_interval: Duration::from_secs(1),
            recognition_interval: Duration::from_secs(10),
        }
    }
}

/// External services the session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub detector: Arc<dyn Detector>,
    pub uploader: Arc<dyn UploadSink>,
    pub exchange: Arc<dyn NameExchange>,
    pub persistence: Arc<dyn GalleryPersistence>,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Detector failed; nothing changed.
    Skipped,
    /// No face in view. `lost_emitted` is true on the first such tick.
    NoFace { lost_emitted: bool },
    /// Face tracked; no recognition pass this tick.
    Tracked,
    Recognized(Resolution),
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: TrackingState,
    pub face_present: bool,
    pub recognized_name: Option<String>,
    pub result_name: Option<String>,
    pub has_exact_name: bool,
    pub still_count: u32,
    pub representatives: Representatives,
    pub gallery_size: usize,
    pub upload_interval_ms: u64,
    pub recognition_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentitySummary {
    pub name: String,
    pub dimension: usize,
}

pub struct Session {
    collaborators: Collaborators,
    gallery: Gallery,
    aggregator: RollingAggregator,
    resolver: IdentityResolver,
    upload_interval: Duration,
    recognition_interval: Duration,
    last_upload: Option<DateTime<Local>>,
    last_recognition: Option<DateTime<Local>>,
    /// Latest tick reported age, gender and an expression.
    attributes_ready: bool,
    face_present: bool,
}

impl Session {
    /// Build a session and restore the gallery from persistence.
    ///
    /// An unreadable snapshot is discarded and the session starts empty.
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        let mut gallery = Gallery::new();
        match collaborators.persistence.load() {
            Ok(Some(snapshot)) => {
                gallery.restore(snapshot);
                tracing::info!(identities = gallery.len(), "gallery restored");
            }
            Ok(None) => tracing::info!("no saved gallery, starting empty"),
            Err(e) => tracing::warn!(error = %e, "discarding unreadable gallery snapshot"),
        }

        let resolver = IdentityResolver::new(
            EuclideanMatcher {
                threshold: config.match_threshold,
            },
            StabilityTracker::new(config.movement_threshold),
            config.still_threshold,
        );

        Self {
            collaborators,
            gallery,
            aggregator: RollingAggregator::new(config.window_size),
            resolver,
            upload_interval: config.upload_interval,
            recognition_interval: config.recognition_interval,
            last_upload: None,
            last_recognition: None,
            attributes_ready: false,
            face_present: false,
        }
    }

    /// Process one frame captured at `now`.
    pub async fn tick(&mut self, frame: &Frame, now: DateTime<Local>) -> TickOutcome {
        let detections = match self.collaborators.detector.detect_all(frame).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, seq = frame.sequence, "detection failed, skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let Some(face) = detections.into_iter().next() else {
            let lost_emitted = self.face_lost(now).await;
            return TickOutcome::NoFace { lost_emitted };
        };

        self.observe(&face);

        if !self.recognition_due(now) {
            return TickOutcome::Tracked;
        }
        match self.recognition_pass(frame, now).await {
            Some(resolution) => TickOutcome::Recognized(resolution),
            None => TickOutcome::Tracked,
        }
    }

    /// Seconds between uploads.
    pub fn set_upload_interval(&mut self, seconds: u64) -> Result<(), SessionError> {
        self.upload_interval = interval_from_secs(seconds)?;
        tracing::info!(seconds, "upload interval set");
        Ok(())
    }

    /// Seconds between recognition passes.
    pub fn set_recognition_interval(&mut self, seconds: u64) -> Result<(), SessionError> {
        self.recognition_interval = interval_from_secs(seconds)?;
        tracing::info!(seconds, "recognition interval set");
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.resolver.state(),
            face_present: self.face_present,
            recognized_name: self.resolver.recognized_name().map(str::to_string),
            result_name: self.resolver.result_name().map(str::to_string),
            has_exact_name: self.resolver.has_exact_name(),
            still_count: self.resolver.still_count(),
            representatives: self.aggregator.representatives().clone(),
            gallery_size: self.gallery.len(),
            upload_interval_ms: self.upload_interval.as_millis() as u64,
            recognition_interval_ms: self.recognition_interval.as_millis() as u64,
        }
    }

    pub fn identities(&self) -> Vec<IdentitySummary> {
        self.gallery
            .iter()
            .map(|e| IdentitySummary {
                name: e.name.clone(),
                dimension: e.descriptor.len(),
            })
            .collect()
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Forget every identity and save the empty gallery. Returns how many were removed.
    pub async fn clear_gallery(&mut self) -> Result<usize, SessionError> {
        let removed = self.gallery.len();
        self.gallery.clear();
        self.collaborators.persistence.save(&[]).await?;
        tracing::info!(removed, "gallery cleared");
        Ok(removed)
    }

    fn observe(&mut self, face: &Detection) {
        self.face_present = true;
        self.aggregator.observe_detection(face);
        self.attributes_ready = face.age.is_some() && face.gender.is_some() && face.mood().is_some();
        self.resolver.track();
    }

    fn recognition_due(&self, now: DateTime<Local>) -> bool {
        elapsed_at_least(self.last_upload, now, self.upload_interval)
            && elapsed_at_least(self.last_recognition, now, self.recognition_interval)
    }

    /// `None` when the detector failed; the pass is retried on the next tick.
    async fn recognition_pass(&mut self, frame: &Frame, now: DateTime<Local>) -> Option<Resolution> {
        let probe = match self.collaborators.detector.detect_one(frame).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "recognition pass failed");
                return None;
            }
        };

        let probe = probe.and_then(|det| match det.descriptor {
            Some(descriptor) => Some((det.bbox.origin(), descriptor)),
            None => {
                tracing::warn!("detector returned a face without descriptor");
                None
            }
        });

        let resolution = match probe {
            Some((position, descriptor)) => {
                self.resolver
                    .resolve(
                        position,
                        &descriptor,
                        &mut self.gallery,
                        &self.aggregator,
                        self.collaborators.exchange.as_ref(),
                        &now,
                    )
                    .await
            }
            None => self.resolver.face_missing(),
        };
        tracing::debug!(?resolution, "recognition cycle");

        if resolution.gallery_changed() {
            self.persist().await;
        }
        if resolution != Resolution::NoFace {
            self.upload_current(frame, now).await;
        }

        self.last_recognition = Some(now);
        Some(resolution)
    }

    async fn upload_current(&mut self, frame: &Frame, now: DateTime<Local>) {
        let state = self.resolver.recognition_state();
        if !self.attributes_ready || state != RecognitionState::Recognized {
            tracing::debug!(?state, "skipping upload");
            return;
        }

        let image = match frame.encode_png() {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(error = %e, "could not encode frame, uploading without image");
                None
            }
        };
        let reps = self.aggregator.representatives().clone();
        let record = UploadRecord {
            image,
            age: reps.age,
            gender: reps.gender,
            mood: reps.mood,
            recognition_state: state,
            recognized_name: self.resolver.display_name().to_string(),
        };

        self.last_upload = Some(now);
        self.send(record).await;
    }

    /// Edge-triggered: only the first empty tick after a face emits a record.
    async fn face_lost(&mut self, now: DateTime<Local>) -> bool {
        let emit = self.face_present;
        if emit {
            tracing::info!(name = self.resolver.display_name(), "face lost");
            self.face_present = false;

            let reps = self.aggregator.representatives().clone();
            let record = UploadRecord {
                image: None,
                age: reps.age,
                gender: reps.gender,
                mood: reps.mood,
                recognition_state: RecognitionState::Lost,
                recognized_name: self.resolver.display_name().to_string(),
            };
            self.last_upload = Some(now);
            self.send(record).await;
        }

        self.aggregator.reset();
        self.resolver.reset();
        self.attributes_ready = false;
        emit
    }

    async fn send(&self, record: UploadRecord) {
        let state = record.recognition_state;
        match self.collaborators.uploader.upload(record).await {
            Ok(()) => tracing::debug!(state = state.as_str(), "uploaded"),
            Err(e) => tracing::warn!(error = %e, state = state.as_str(), "upload failed"),
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.collaborators.persistence.save(&self.gallery.snapshot()).await {
            tracing::warn!(error = %e, "failed to save gallery");
        }
    }
}

fn interval_from_secs(seconds: u64) -> Result<Duration, SessionError> {
    if seconds == 0 {
        return Err(SessionError::InvalidInterval);
    }
    Ok(Duration::from_millis(seconds.saturating_mul(1000)))
}

/// A clock that went backwards counts as elapsed.
fn elapsed_at_least(since: Option<DateTime<Local>>, now: DateTime<Local>, interval: Duration) -> bool {
    match since {
        None => true,
        Some(t) => now
            .signed_duration_since(t)
            .to_std()
            .map_or(true, |elapsed| elapsed >= interval),
    }
}
