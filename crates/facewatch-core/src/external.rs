//! Collaborators the session drives but does not implement: frame capture,
//! the face detector, the upload and confirmed-name endpoints, and gallery
//! persistence.

use crate::frame::Frame;
use crate::types::{Detection, Identity};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Value the confirmed-name endpoint reports while no name has been entered.
pub const NAME_NOT_SET: &str = "NotYet";

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("detection failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("gallery io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt gallery snapshot: {0}")]
    Corrupt(String),
}

/// Source of frames (camera, snapshot URL, ...).
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn grab(&self) -> Result<Frame, DetectionError>;
}

/// Face detector and descriptor extractor.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Lightweight pass: boxes and age/gender/expression estimates, most
    /// prominent face first.
    async fn detect_all(&self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;

    /// Heavier pass: the single best face with its descriptor.
    async fn detect_one(&self, frame: &Frame) -> Result<Option<Detection>, DetectionError>;
}

/// `recognizestate` reported with each upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecognitionState {
    #[serde(rename = "true")]
    Recognized,
    #[serde(rename = "false")]
    Unrecognized,
    #[serde(rename = "lost")]
    Lost,
}

impl RecognitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionState::Recognized => "true",
            RecognitionState::Unrecognized => "false",
            RecognitionState::Lost => "lost",
        }
    }
}

/// One outbound record: the smoothed attributes of the tracked face.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    /// PNG snapshot of the frame.
    pub image: Option<Vec<u8>>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub mood: Option<String>,
    pub recognition_state: RecognitionState,
    pub recognized_name: String,
}

#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload(&self, record: UploadRecord) -> Result<(), NetworkError>;
}

/// Operator-confirmed name, entered out of band for the face in view.
#[async_trait]
pub trait NameExchange: Send + Sync {
    /// The pending name, or [`NAME_NOT_SET`].
    async fn pending_name(&self) -> Result<String, NetworkError>;

    /// Acknowledge the pending name so it is not applied twice.
    async fn clear(&self) -> Result<(), NetworkError>;
}

/// Durable storage for gallery snapshots.
///
/// `load` runs once at startup, before the session task; `save` runs inside
/// it and must not block the runtime.
#[async_trait]
pub trait GalleryPersistence: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Identity>>, PersistenceError>;

    async fn save(&self, snapshot: &[Identity]) -> Result<(), PersistenceError>;
}

impl From<NetworkError> for DetectionError {
    fn from(e: NetworkError) -> Self {
        DetectionError::Unavailable(e.to_string())
    }
}
