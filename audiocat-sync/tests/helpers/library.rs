//! Temporary music library plus catalog

use super::fixture_source::{FixtureTagSource, FixtureTags};
use audiocat_sync::{ActionFlags, RunOptions, RunSummary, SyncResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// `<tmp>/music` as the root, `<tmp>/catalog.db` as the catalog
///
/// The TempDir must be kept alive for the duration of the test.
pub struct Library {
    _dir: TempDir,
    pub root: PathBuf,
    pub catalog: PathBuf,
}

impl Library {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("music");
        std::fs::create_dir_all(&root).unwrap();
        let catalog = dir.path().join("catalog.db");
        Self { _dir: dir, root, catalog }
    }

    /// Write a fixture file at `relative` under the root
    pub fn write(&self, relative: &str, tags: &FixtureTags) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(tags).unwrap()).unwrap();
        path
    }

    /// Write a file no reader can parse
    pub fn write_corrupt(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"\x00\x01 not a container").unwrap();
        path
    }

    /// Path string as stored in the catalog (root is canonicalized by the run)
    pub fn stored(&self, relative: &str) -> String {
        std::fs::canonicalize(&self.root)
            .unwrap()
            .join(relative)
            .to_string_lossy()
            .into_owned()
    }

    pub fn options(&self, flags: ActionFlags) -> RunOptions {
        RunOptions {
            root: Some(self.root.clone()),
            catalog: self.catalog.clone(),
            full_rescan: false,
            flags,
            workers: 2,
            release_staleness_hours: 168,
        }
    }

    pub async fn run_with(&self, options: &RunOptions) -> SyncResult<RunSummary> {
        audiocat_sync::run(options, Arc::new(FixtureTagSource)).await
    }

    /// Default pipeline; panics on a fatal error
    pub async fn run(&self) -> RunSummary {
        self.run_with(&self.options(ActionFlags::default())).await.unwrap()
    }
}

/// Move a file's modification time forward
pub fn bump_mtime(path: &Path, secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(secs)).unwrap();
}
