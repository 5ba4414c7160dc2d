//! In-memory collaborators for unit tests.

use crate::external::{
    DetectionError, Detector, GalleryPersistence, NameExchange, NetworkError, PersistenceError,
    UploadRecord, UploadSink, NAME_NOT_SET,
};
use crate::frame::Frame;
use crate::types::{BoundingBox, Descriptor, Detection, Identity};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) fn blank_frame() -> Frame {
    Frame::from_rgb(vec![0; 4 * 4 * 3], 4, 4, 0).unwrap()
}

/// A face at (x, y) with stable attributes and the given descriptor.
pub(crate) fn face(x: f32, y: f32, descriptor: &[f32]) -> Detection {
    let mut det = Detection {
        bbox: BoundingBox {
            x,
            y,
            width: 80.0,
            height: 80.0,
        },
        age: Some(30.2),
        gender: Some("male".into()),
        descriptor: Some(Descriptor::new(descriptor.to_vec())),
        ..Default::default()
    };
    det.expressions.insert("neutral".into(), 0.9);
    det.expressions.insert("happy".into(), 0.1);
    det
}

/// Reports whatever face is currently set, on both passes.
#[derive(Default)]
pub(crate) struct FakeDetector {
    face: Mutex<Option<Detection>>,
    failing: AtomicBool,
    describe_failing: AtomicBool,
    pub describe_calls: AtomicUsize,
}

impl FakeDetector {
    pub fn set_face(&self, face: Option<Detection>) {
        *self.face.lock().unwrap() = face;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only the recognition pass; `detect_all` keeps working.
    pub fn set_describe_failing(&self, failing: bool) {
        self.describe_failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DetectionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DetectionError::Unavailable("fake detector offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Detector for FakeDetector {
    async fn detect_all(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.check()?;
        Ok(self.face.lock().unwrap().clone().into_iter().collect())
    }

    async fn detect_one(&self, _frame: &Frame) -> Result<Option<Detection>, DetectionError> {
        self.check()?;
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.describe_failing.load(Ordering::SeqCst) {
            return Err(DetectionError::Failed("descriptor extraction timed out".into()));
        }
        Ok(self.face.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub records: Mutex<Vec<UploadRecord>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<UploadRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadSink for RecordingSink {
    async fn upload(&self, record: UploadRecord) -> Result<(), NetworkError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

pub(crate) struct FakeExchange {
    pending: Mutex<String>,
    failing: bool,
    pub queries: AtomicUsize,
    pub clears: AtomicUsize,
}

impl FakeExchange {
    pub fn not_set() -> Self {
        Self::with_name(NAME_NOT_SET)
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            pending: Mutex::new(name.to_string()),
            failing: false,
            queries: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::not_set()
        }
    }
}

#[async_trait]
impl NameExchange for FakeExchange {
    async fn pending_name(&self) -> Result<String, NetworkError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(NetworkError::Transport("connection refused".into()));
        }
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn clear(&self) -> Result<(), NetworkError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock().unwrap() = NAME_NOT_SET.to_string();
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryPersistence {
    pub saved: Mutex<Option<Vec<Identity>>>,
    corrupt: bool,
    pub saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn with(snapshot: Vec<Identity>) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
            ..Default::default()
        }
    }

    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Default::default()
        }
    }

    pub fn saved(&self) -> Option<Vec<Identity>> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl GalleryPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Vec<Identity>>, PersistenceError> {
        if self.corrupt {
            return Err(PersistenceError::Corrupt("expected value at line 1".into()));
        }
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn save(&self, snapshot: &[Identity]) -> Result<(), PersistenceError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.saved.lock().unwrap() = Some(snapshot.to_vec());
        Ok(())
    }
}
