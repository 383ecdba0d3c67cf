//! Run phases
//!
//! - `file_scanner`: tree walk shared by every phase that needs the root
//! - `folder_resolver`: canonical per-folder release tuple
//! - `sync_controller`: change detection and per-file upserts
//! - `orphan_pruner`: removal of rows whose files or folders are gone
//! - `derived`: artwork and bitrate-range passes
//! - `orchestrator`: sequencing, lock, run summary

pub mod derived;
pub mod file_scanner;
pub mod folder_resolver;
pub mod orchestrator;
pub mod orphan_pruner;
pub mod run_lock;
pub mod sync_controller;

pub use derived::{ArtworkCache, DerivedReport};
pub use file_scanner::{FileScanner, ScanError, ScannedTree};
pub use folder_resolver::{resolve_folders, FolderScan, FolderTuple};
pub use orchestrator::{run, RunSummary};
pub use orphan_pruner::{prune_orphans, PruneReport};
pub use run_lock::RunLock;
pub use sync_controller::{SyncController, SyncOptions, SyncReport, FILE_ERRORS_TARGET};
