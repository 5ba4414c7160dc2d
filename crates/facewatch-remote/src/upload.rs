use crate::client::{check_status, endpoint, transport};
use async_trait::async_trait;
use facewatch_core::{NetworkError, UploadRecord, UploadSink};
use reqwest::multipart::{Form, Part};

/// Posts upload records to `{server}/upload` as multipart form data.
///
/// Fields: `file` (PNG, only when an image is attached), `age`, `gender`,
/// `mood`, `recognizestate`, `recognizedname`. Absent attributes are sent
/// as empty strings.
pub struct HttpUploadSink {
    client: reqwest::Client,
    url: String,
}

impl HttpUploadSink {
    pub fn new(client: reqwest::Client, server_url: &str) -> Self {
        Self {
            client,
            url: endpoint(server_url, "upload"),
        }
    }
}

fn form(record: UploadRecord) -> Result<Form, NetworkError> {
    let mut form = Form::new()
        .text("age", record.age.map(|a| a.to_string()).unwrap_or_default())
        .text("gender", record.gender.unwrap_or_default())
        .text("mood", record.mood.unwrap_or_default())
        .text("recognizestate", record.recognition_state.as_str())
        .text("recognizedname", record.recognized_name);

    if let Some(png) = record.image {
        let part = Part::bytes(png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(transport)?;
        form = form.part("file", part);
    }
    Ok(form)
}

#[async_trait]
impl UploadSink for HttpUploadSink {
    async fn upload(&self, record: UploadRecord) -> Result<(), NetworkError> {
        let state = record.recognition_state;
        let response = self
            .client
            .post(&self.url)
            .multipart(form(record)?)
            .send()
            .await
            .map_err(transport)?;
        check_status(response)?;
        tracing::debug!(state = state.as_str(), "record uploaded");
        Ok(())
    }
}
