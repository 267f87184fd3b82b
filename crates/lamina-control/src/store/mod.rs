//! State record persistence.
//!
//! The state record is the only thing that survives between invocations. It
//! names the layer version Lamina owns; everything else is re-derived from
//! the provider on each run. A single writer is assumed.

mod file;
mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use async_trait::async_trait;
use lamina_core::{LayerResult, StateRecord};

/// Backend for the persisted [`StateRecord`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the current record.
    ///
    /// Returns an empty record if nothing has been saved yet.
    async fn load(&self) -> LayerResult<StateRecord>;

    /// Replace the stored record.
    async fn save(&self, record: &StateRecord) -> LayerResult<()>;

    /// Reset to the empty record.
    async fn clear(&self) -> LayerResult<()> {
        self.save(&StateRecord::default()).await
    }
}
