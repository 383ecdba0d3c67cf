//! Error types for audiocat-sync
//!
//! Per-file failures never reach this type: they are counted and logged on
//! the file-error channel. `SyncError` covers what stops a phase or a run.

use crate::services::file_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Run-level error
#[derive(Debug, Error)]
pub enum SyncError {
    /// Root missing, absent on disk, or not a directory (fatal, before any mutation)
    #[error("Invalid music root: {0}")]
    RootPathInvalid(#[from] ScanError),

    /// Another run holds the catalog lock
    #[error("Catalog is locked by another run (remove {0} if no run is active)")]
    Locked(PathBuf),

    /// audiocat-common error
    #[error("Common error: {0}")]
    Common(#[from] audiocat_common::Error),

    /// Catalog store error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for run-level operations
pub type SyncResult<T> = Result<T, SyncError>;
