//! Music tree walker
//!
//! Recursive discovery of supported audio files. A walk yields the supported
//! files in a deterministic order (entries sorted by file name at every level)
//! plus the set of every directory seen, which orphan detection diffs against.

use crate::extractors::ContainerFamily;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Root path errors; all are fatal before any catalog mutation
#[derive(Debug, Error)]
pub enum ScanError {
    /// No root given on the command line, environment or config file
    #[error("No music root configured")]
    NotConfigured,

    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Result of one walk
#[derive(Debug, Clone, Default)]
pub struct ScannedTree {
    /// Supported audio files in walk order
    pub files: Vec<PathBuf>,
    /// Every directory walked, root included
    pub folders: HashSet<PathBuf>,
    /// Entries the walk could not read; nothing beneath them is known to be gone
    pub incomplete: HashSet<PathBuf>,
}

impl ScannedTree {
    /// Whether `path` lies at or under an entry the walk failed to read
    pub fn is_unobserved(&self, path: &Path) -> bool {
        self.incomplete.iter().any(|dir| path.starts_with(dir))
    }
}

/// Audio file scanner
pub struct FileScanner {
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Create new file scanner with default ignore patterns
    ///
    /// Ignores system entries like .DS_Store, Thumbs.db, .git, etc.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "@eaDir".to_string(),
            ],
        }
    }

    /// Check the root before anything touches the catalog
    pub fn validate_root(root_path: &Path) -> Result<(), ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        Ok(())
    }

    /// Walk `root_path`
    ///
    /// Unreadable entries are logged, recorded in [`ScannedTree::incomplete`]
    /// and skipped; only an invalid root fails.
    pub fn scan(&self, root_path: &Path) -> Result<ScannedTree, ScanError> {
        Self::validate_root(root_path)?;

        let mut tree = ScannedTree::default();

        // follow_links: walkdir reports symlink loops as entry errors
        let walker = WalkDir::new(root_path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_dir() {
                        tree.folders.insert(path.to_path_buf());
                    } else if entry.file_type().is_file() && ContainerFamily::from_path(path).is_some() {
                        tree.files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                    let at = e.path().unwrap_or(root_path);
                    tree.incomplete.insert(at.to_path_buf());
                }
            }
        }

        tracing::debug!(
            files = tree.files.len(),
            folders = tree.folders.len(),
            incomplete = tree.incomplete.len(),
            "Scan of {} complete",
            root_path.display()
        );

        Ok(tree)
    }

    /// Check if entry should be processed
    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let file_name = entry.file_name().to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
