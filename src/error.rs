//! Error types

use crate::ingest::IngestError;
use crate::timing::SyncError;
use crate::types::config::ConfigError;

/// Main error type for telepresence operations.
#[derive(Debug, thiserror::Error)]
pub enum TelepresenceError {
    /// Invalid streaming configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Media pipeline failure.
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Time synchronization failure.
    #[error("time sync error: {0}")]
    Sync(#[from] SyncError),

    /// Socket setup failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
