//! Error types shared by every Lamina crate.

/// Result type alias using [`LayerError`].
pub type LayerResult<T> = Result<T, LayerError>;

/// Errors raised while packaging, publishing or removing a layer.
///
/// Provider "not found" responses never appear here: the gateway translates
/// them into absent values before they reach the engine.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// Invalid configuration, unsupported archive format or missing credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// A layer ARN could not be parsed.
    #[error("invalid layer ARN: {0}")]
    InvalidArn(String),

    /// Filesystem error while packaging or hashing.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Archive writer failure.
    #[error("archive error: {0}")]
    Archive(String),

    /// The remote layer API rejected a call.
    #[error("{operation} failed: {message}")]
    Provider {
        /// Remote operation name, e.g. `PublishLayerVersion`.
        operation: &'static str,
        /// Provider error message.
        message: String,
    },

    /// Object storage upload failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// State record could not be read or written.
    #[error("state error: {0}")]
    State(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LayerError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider error for the named remote operation.
    #[must_use]
    pub fn provider(operation: &'static str, msg: impl Into<String>) -> Self {
        Self::Provider {
            operation,
            message: msg.into(),
        }
    }

    /// Create a state error.
    #[must_use]
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
