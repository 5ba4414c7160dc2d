use crate::engine::{EngineError, SessionHandle};
use facewatch_core::SessionError;
use zbus::interface;

pub const BUS_NAME: &str = "org.facewatch.Facewatch1";
pub const OBJECT_PATH: &str = "/org/facewatch/Facewatch1";

/// D-Bus control interface for the Facewatch daemon.
///
/// Bus name: org.facewatch.Facewatch1
/// Object path: /org/facewatch/Facewatch1
pub struct FacewatchService {
    handle: SessionHandle,
}

impl FacewatchService {
    pub fn new(handle: SessionHandle) -> Self {
        Self { handle }
    }
}

fn to_fdo(e: EngineError) -> zbus::fdo::Error {
    match e {
        EngineError::Session(SessionError::InvalidInterval) => {
            zbus::fdo::Error::InvalidArgs("interval must be at least one second".into())
        }
        other => zbus::fdo::Error::Failed(other.to_string()),
    }
}

#[interface(name = "org.facewatch.Facewatch1")]
impl FacewatchService {
    /// Set the minimum number of seconds between uploads.
    async fn set_upload_interval(&self, seconds: u32) -> zbus::fdo::Result<()> {
        tracing::info!(seconds, "set_upload_interval requested");
        self.handle
            .set_upload_interval(u64::from(seconds))
            .await
            .map_err(to_fdo)
    }

    /// Set the minimum number of seconds between recognition passes.
    async fn set_recognition_interval(&self, seconds: u32) -> zbus::fdo::Result<()> {
        tracing::info!(seconds, "set_recognition_interval requested");
        self.handle
            .set_recognition_interval(u64::from(seconds))
            .await
            .map_err(to_fdo)
    }

    /// Return session status as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self.handle.status().await.map_err(to_fdo)?;
        let mut value = serde_json::to_value(&status)
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        value["version"] = env!("CARGO_PKG_VERSION").into();
        Ok(value.to_string())
    }

    /// List gallery identities as a JSON array of `{name, dimension}`.
    async fn list_identities(&self) -> zbus::fdo::Result<String> {
        let identities = self.handle.identities().await.map_err(to_fdo)?;
        serde_json::to_string(&identities).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Forget every identity. Returns true when anything was removed.
    async fn clear_gallery(&self) -> zbus::fdo::Result<bool> {
        tracing::info!("clear_gallery requested");
        let removed = self.handle.clear_gallery().await.map_err(to_fdo)?;
        Ok(removed > 0)
    }
}
