use crate::client::{check_status, decode, transport};
use async_trait::async_trait;
use facewatch_core::{DetectionError, Frame, FrameSource};
use std::sync::atomic::{AtomicU32, Ordering};

/// Grabs frames by fetching a still image (JPEG, PNG, ...) from a URL, e.g.
/// an IP camera's snapshot endpoint.
pub struct HttpFrameSource {
    client: reqwest::Client,
    url: String,
    sequence: AtomicU32,
}

impl HttpFrameSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            sequence: AtomicU32::new(0),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn grab(&self) -> Result<Frame, DetectionError> {
        let response = self.client.get(&self.url).send().await.map_err(transport)?;
        let bytes = check_status(response)?
            .bytes()
            .await
            .map_err(decode)?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::decode(&bytes, sequence)
            .map_err(|e| DetectionError::Failed(format!("snapshot decode: {e}")))?;
        tracing::trace!(sequence, width = frame.width, height = frame.height, "frame grabbed");
        Ok(frame)
    }
}
