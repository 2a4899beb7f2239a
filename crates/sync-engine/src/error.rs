// crates/sync-engine/src/error.rs
//! Error types for sync operations

use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while preparing or applying a sync round
#[derive(Debug, Error)]
pub enum SyncError {
    /// A storage command failed
    #[error("storage error: {0}")]
    Storage(#[from] citestream_core::DataError),

    /// An annotation selected for splitting has no usable geometry
    #[error("annotation {0} cannot be split")]
    CannotSplit(String),

    /// Serialization error while rendering batch payloads
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
