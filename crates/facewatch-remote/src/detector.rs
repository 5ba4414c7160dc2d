//! Client for an out-of-process face detector.
//!
//! The service takes a PNG body and answers JSON:
//! - `POST /detect`   → `{"faces": [Detection, ...]}`, most prominent first
//! - `POST /describe` → `{"face": Detection | null}`, with a descriptor

use crate::client::{check_status, decode, endpoint, transport};
use async_trait::async_trait;
use facewatch_core::{DetectionError, Detection, Detector, Frame};
use serde::Deserialize;

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    faces: Vec<Detection>,
}

#[derive(Deserialize)]
struct DescribeResponse {
    face: Option<Detection>,
}

pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetector {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post_frame(&self, path: &str, frame: &Frame) -> Result<reqwest::Response, DetectionError> {
        let png = frame
            .encode_png()
            .map_err(|e| DetectionError::Failed(format!("frame encode: {e}")))?;
        let response = self
            .client
            .post(endpoint(&self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .map_err(transport)?;
        Ok(check_status(response)?)
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect_all(&self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let response = self.post_frame("detect", frame).await?;
        let body: DetectResponse = response.json().await.map_err(decode)?;
        tracing::trace!(sequence = frame.sequence, faces = body.faces.len(), "detect");
        Ok(body.faces)
    }

    async fn detect_one(&self, frame: &Frame) -> Result<Option<Detection>, DetectionError> {
        let response = self.post_frame("describe", frame).await?;
        let body: DescribeResponse = response.json().await.map_err(decode)?;
        if let Some(face) = &body.face {
            if face.descriptor.is_none() {
                return Err(DetectionError::Failed(
                    "describe returned a face without a descriptor".into(),
                ));
            }
        }
        Ok(body.face)
    }
}
