//! Error types for strata-forge.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling forge metadata.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No forge is registered under this ID.
    #[error("unknown forge: {0}")]
    UnknownForge(String),

    /// Metadata was handed to a forge that does not own it.
    #[error("{expected} forge cannot handle {actual} metadata")]
    ForgeMismatch {
        /// Forge that was asked to handle the metadata.
        expected: &'static str,
        /// Forge that owns the metadata.
        actual: &'static str,
    },

    /// Stored metadata could not be (de)serialized.
    #[error("invalid change metadata: {0}")]
    Json(#[from] serde_json::Error),
}
