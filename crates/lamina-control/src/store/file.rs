//! JSON file state store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lamina_core::{LayerError, LayerResult, StateRecord};
use tracing::debug;

use super::StateStore;

/// Stores the record as pretty-printed JSON at a fixed path.
///
/// An empty record is written as `{}`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> LayerResult<StateRecord> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting empty");
                return Ok(StateRecord::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map_err(|e| {
            LayerError::state(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    async fn save(&self, record: &StateRecord) -> LayerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut json = serde_json::to_vec_pretty(record)
            .map_err(|e| LayerError::state(format!("failed to serialise state: {e}")))?;
        json.push(b'\n');
        tokio::fs::write(&self.path, json).await?;

        debug!(path = %self.path.display(), "saved state");
        Ok(())
    }
}
