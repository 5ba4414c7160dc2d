use async_trait::async_trait;
use facewatch_core::{GalleryPersistence, Identity, PersistenceError};
use std::path::{Path, PathBuf};

/// Gallery snapshot stored as a pretty-printed JSON array of
/// `{"name": .., "descriptor": [..]}`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a snapshot file directly, without a store.
    pub fn read(path: &Path) -> Result<Option<Vec<Identity>>, PersistenceError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl GalleryPersistence for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Identity>>, PersistenceError> {
        Self::read(&self.path)
    }

    /// Written to a sibling temp file and renamed into place, so a crash
    /// mid-write leaves the previous snapshot intact.
    async fn save(&self, snapshot: &[Identity]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), identities = snapshot.len(), "gallery saved");
        Ok(())
    }
}
