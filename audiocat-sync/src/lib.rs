//! audiocat-sync library interface
//!
//! Keeps a SQLite catalog in step with a folder tree of MP3, FLAC and M4A
//! files. The binary is a thin wrapper around [`services::run`]; everything
//! else is public for integration testing.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod services;

pub use crate::config::{Action, ActionFlags, CliOverrides, RunOptions};
pub use crate::error::{SyncError, SyncResult};
pub use crate::extractors::{LoftyTagSource, TagSource};
pub use crate::services::{run, RunSummary, FILE_ERRORS_TARGET};
