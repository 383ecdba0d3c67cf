//! Folder consistency resolver
//!
//! First pass over the tree. Per-file tags inside one release drift
//! (capitalization, album-artist present on some tracks only, compilation
//! noise), so the first readable file of each folder freezes that folder's
//! canonical tuple and every track in the folder is written with it.

use crate::extractors::{ContainerFamily, TagSource, TrackTags};
use crate::services::file_scanner::{FileScanner, ScanError, ScannedTree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Canonical per-folder release attributes
#[derive(Debug, Clone, PartialEq)]
pub struct FolderTuple {
    pub album: String,
    /// Resolved primary artist
    pub artist: String,
    pub year: Option<i32>,
    pub genre: String,
    pub label: Option<String>,
}

impl FolderTuple {
    /// Tuple derived from one file's tags
    pub fn from_tags(tags: &TrackTags) -> Self {
        Self {
            album: tags.album.clone(),
            artist: tags.primary_artist(),
            year: tags.year,
            genre: tags.genre.clone(),
            label: tags.label.clone(),
        }
    }
}

/// Output of the resolver pass
///
/// Immutable once built; the sync controller and orphan pruner only read it.
#[derive(Debug, Clone, Default)]
pub struct FolderScan {
    /// folder → canonical tuple; folders with no readable file are absent
    pub tuples: HashMap<PathBuf, FolderTuple>,
    /// The walk the tuples were built from
    pub tree: ScannedTree,
}

impl FolderScan {
    pub fn tuple_for(&self, folder: &Path) -> Option<&FolderTuple> {
        self.tuples.get(folder)
    }
}

/// Walk `root` and build the folder → tuple map
///
/// Synchronous: tag reads are blocking file I/O, callers run this on a
/// blocking thread.
pub fn resolve_folders(
    scanner: &FileScanner,
    source: &dyn TagSource,
    root: &Path,
) -> Result<FolderScan, ScanError> {
    let tree = scanner.scan(root)?;
    let tuples = build_tuples(source, &tree.files);

    info!(
        "Folder pass: {} folders with a canonical tuple, {} files seen",
        tuples.len(),
        tree.files.len()
    );

    Ok(FolderScan { tuples, tree })
}

/// First readable file per folder wins; later files never override it
pub fn build_tuples(source: &dyn TagSource, files: &[PathBuf]) -> HashMap<PathBuf, FolderTuple> {
    let mut tuples: HashMap<PathBuf, FolderTuple> = HashMap::new();

    for path in files {
        let Some(folder) = path.parent() else { continue };
        if tuples.contains_key(folder) {
            continue;
        }
        let Some(family) = ContainerFamily::from_path(path) else { continue };

        match source.read_tags(path, family) {
            Ok(tags) => {
                tuples.insert(folder.to_path_buf(), FolderTuple::from_tags(&tags));
            }
            Err(e) => {
                // Counted by the sync pass; here the next file in the folder gets a turn
                debug!(path = %path.display(), error = %e, "Folder pass skipped unreadable file");
            }
        }
    }

    tuples
}
