//! In-memory state store for testing.

use std::sync::RwLock;

use async_trait::async_trait;
use lamina_core::{LayerError, LayerResult, StateRecord};

use super::StateStore;

/// In-memory state store for testing.
///
/// Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    record: RwLock<StateRecord>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `record`.
    #[must_use]
    pub fn with_record(record: StateRecord) -> Self {
        Self {
            record: RwLock::new(record),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> LayerResult<StateRecord> {
        let record = self
            .record
            .read()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        Ok(record.clone())
    }

    async fn save(&self, record: &StateRecord) -> LayerResult<()> {
        let mut current = self
            .record
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        *current = record.clone();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty_and_clears() {
        let store = MemoryStateStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let record = StateRecord {
            name: Some("deps".to_owned()),
            ..StateRecord::default()
        };
        store.save(&record).await.unwrap();
        assert_eq!(store.load().await.unwrap(), record);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
