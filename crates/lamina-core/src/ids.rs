//! Identifier generation.
//!
//! Permission statement ids, fallback cache keys and generated layer names
//! all come from an [`IdSource`] so tests can make them deterministic.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique lowercase identifiers.
pub trait IdSource: Send + Sync {
    /// Return a new identifier.
    fn next_id(&self) -> String;
}

/// ULID-backed identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidIds;

impl IdSource for UlidIds {
    fn next_id(&self) -> String {
        ulid::Ulid::new().to_string().to_lowercase()
    }
}

/// Deterministic identifiers `<prefix>1`, `<prefix>2`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    /// Create a sequence with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.prefix)
    }
}
