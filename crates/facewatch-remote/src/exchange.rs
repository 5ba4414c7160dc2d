use crate::client::{check_status, decode, endpoint, transport};
use async_trait::async_trait;
use facewatch_core::{NameExchange, NetworkError};
use serde::Deserialize;

#[derive(Deserialize)]
struct PendingName {
    updatename: String,
}

/// Confirmed-name endpoints on the analytics server:
/// `GET /getupdatename` and `POST /clearupdatename`.
pub struct HttpNameExchange {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNameExchange {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl NameExchange for HttpNameExchange {
    async fn pending_name(&self) -> Result<String, NetworkError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "getupdatename"))
            .send()
            .await
            .map_err(transport)?;
        let body: PendingName = check_status(response)?.json().await.map_err(decode)?;
        Ok(body.updatename)
    }

    async fn clear(&self) -> Result<(), NetworkError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "clearupdatename"))
            .send()
            .await
            .map_err(transport)?;
        check_status(response)?;
        tracing::debug!("pending name cleared");
        Ok(())
    }
}
