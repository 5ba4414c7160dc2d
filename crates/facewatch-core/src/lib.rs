//! facewatch-core — Face tracking and identity resolution engine.
//!
//! Smooths per-frame age/gender/mood estimates, recognizes the tracked face
//! against a small in-memory gallery by Euclidean descriptor distance,
//! registers faces that hold still long enough, and applies operator-confirmed
//! names to provisional identities. Detection, capture, uploads and storage
//! are reached through the traits in [`external`].

pub mod aggregator;
pub mod external;
pub mod frame;
pub mod gallery;
pub mod recognizer;
pub mod resolver;
pub mod session;
pub mod stability;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use external::{
    DetectionError, Detector, FrameSource, GalleryPersistence, NameExchange, NetworkError,
    PersistenceError, RecognitionState, UploadRecord, UploadSink,
};
pub use frame::Frame;
pub use gallery::{Gallery, GalleryError};
pub use recognizer::{EuclideanMatcher, Matcher, Recognition};
pub use resolver::{IdentityResolver, Resolution, TrackingState};
pub use session::{
    Collaborators, IdentitySummary, Session, SessionConfig, SessionError, SessionStatus,
    TickOutcome,
};
pub use types::{BoundingBox, Descriptor, Detection, Identity, Position};
