//! Run orchestrator
//!
//! Sequences one run: validate the root, take the run lock, open the
//! catalog (schema ensure always runs), then execute the planned actions in
//! order. A failed phase is logged and recorded; later phases still run.
//! Only an invalid root, a held lock, or a catalog that cannot be opened
//! fail the run as a whole.

use crate::config::{Action, RunOptions};
use crate::db::{self, MaintenanceReport, SchemaManager, SchemaReport};
use crate::error::{SyncError, SyncResult};
use crate::extractors::TagSource;
use crate::services::derived::{self, ArtworkCache, DerivedReport};
use crate::services::file_scanner::{FileScanner, ScanError, ScannedTree};
use crate::services::folder_resolver::{resolve_folders, FolderScan};
use crate::services::orphan_pruner::{prune_orphans, PruneReport};
use crate::services::run_lock::RunLock;
use crate::services::sync_controller::{SyncController, SyncReport};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub actions: Vec<Action>,
    pub schema: SchemaReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_upgrade: Option<SchemaReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceReport>,
    pub sync: SyncReport,
    pub prune: PruneReport,
    pub derived: DerivedReport,
    /// Phases that failed; the run continued past each of them
    pub failed_phases: Vec<String>,
}

impl RunSummary {
    /// Files that could not be read or written
    pub fn errors(&self) -> usize {
        self.sync.errors()
    }

    /// Catalog rows written by every phase
    pub fn rows_written(&self) -> u64 {
        self.sync.rows_written + self.prune.rows_written + self.derived.rows_written
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<String> = self.actions.iter().map(Action::to_string).collect();
        writeln!(f, "Actions:          {}", actions.join(", "))?;
        writeln!(
            f,
            "Schema:           {} tables, {} columns, {} indexes, {} FTS tables created",
            self.schema.tables_created,
            self.schema.columns_added,
            self.schema.indexes_created,
            self.schema.fts_tables_created
        )?;
        if let Some(maintenance) = &self.maintenance {
            writeln!(
                f,
                "Maintenance:      {} indexes, {} FTS tables rebuilt",
                maintenance.indexes_rebuilt, maintenance.fts_rebuilt
            )?;
        }
        writeln!(
            f,
            "Files:            {} seen, {} unchanged, {} written",
            self.sync.files_seen, self.sync.unchanged, self.sync.upserted
        )?;
        writeln!(
            f,
            "Errors:           {} ({} unreadable, {} write failures)",
            self.errors(),
            self.sync.unreadable,
            self.sync.write_failed
        )?;
        writeln!(
            f,
            "Pruned:           {} releases, {} tracks",
            self.prune.releases_pruned, self.prune.tracks_pruned
        )?;
        writeln!(
            f,
            "Derived:          {} artwork, {} bitrate ranges updated",
            self.derived.artwork_assigned, self.derived.bitrate_ranges_written
        )?;
        write!(f, "Rows written:     {}", self.rows_written())?;
        if !self.failed_phases.is_empty() {
            write!(f, "\nFailed phases:    {}", self.failed_phases.join(", "))?;
        }
        Ok(())
    }
}

/// Execute one run
pub async fn run(options: &RunOptions, source: Arc<dyn TagSource>) -> SyncResult<RunSummary> {
    let plan = options.flags.plan();

    // Root problems are fatal and must surface before the catalog is touched
    let root = if plan.iter().any(|action| action.needs_root()) {
        Some(checked_root(options.root.as_deref())?)
    } else {
        None
    };

    let _lock = RunLock::acquire(&options.catalog)?;
    let (pool, schema) = db::open_and_ensure(&options.catalog).await?;

    tracing::info!(
        catalog = %options.catalog.display(),
        root = ?root,
        actions = ?plan,
        "Run starting"
    );

    let mut summary = RunSummary {
        actions: plan.clone(),
        schema,
        ..Default::default()
    };
    let mut run = Run {
        pool: &pool,
        options,
        source,
        root: root.as_deref(),
        folder_scan: None,
    };

    for action in plan {
        if let Err(e) = run.execute(action, &mut summary).await {
            tracing::error!(phase = %action, error = %e, "Phase failed");
            summary.failed_phases.push(action.to_string());
        }
    }

    pool.close().await;

    tracing::info!(
        files_seen = summary.sync.files_seen,
        errors = summary.errors(),
        rows_written = summary.rows_written(),
        failed_phases = summary.failed_phases.len(),
        "Run completed"
    );

    Ok(summary)
}

/// Validated, absolute root
fn checked_root(root: Option<&Path>) -> SyncResult<PathBuf> {
    let root = root.ok_or(ScanError::NotConfigured)?;
    FileScanner::validate_root(root)?;
    Ok(std::fs::canonicalize(root)?)
}

/// Per-run state shared between phases
struct Run<'a> {
    pool: &'a SqlitePool,
    options: &'a RunOptions,
    source: Arc<dyn TagSource>,
    root: Option<&'a Path>,
    /// Resolver output, reused by pruning when sync ran first
    folder_scan: Option<FolderScan>,
}

impl<'a> Run<'a> {
    async fn execute(&mut self, action: Action, summary: &mut RunSummary) -> SyncResult<()> {
        tracing::info!(phase = %action, "Phase starting");

        match action {
            Action::UpgradeSchema => {
                summary.schema_upgrade = Some(SchemaManager::upgrade(self.pool).await);
            }
            Action::Maintenance => {
                summary.maintenance = Some(SchemaManager::maintenance(self.pool).await);
            }
            Action::Sync => {
                let root = self.root()?;
                let source = Arc::clone(&self.source);
                let walk_root = root.to_path_buf();
                let scan = tokio::task::spawn_blocking(move || {
                    resolve_folders(&FileScanner::new(), source.as_ref(), &walk_root)
                })
                .await??;

                let controller =
                    SyncController::new(self.pool.clone(), Arc::clone(&self.source), self.options.sync_options());
                let result = controller.run(&scan, root).await;
                self.folder_scan = Some(scan);
                summary.sync = result?;
            }
            Action::PruneOrphans => {
                let tree = match &self.folder_scan {
                    Some(scan) => scan.tree.clone(),
                    None => self.walk().await?,
                };
                summary.prune = prune_orphans(self.pool, &tree).await?;
            }
            Action::DerivedAttributes => {
                // The two passes are independent; report the first failure after both ran
                let mut cache = ArtworkCache::new();
                let artwork = derived::update_artwork(self.pool, &mut cache).await;
                let bitrate = derived::update_bitrate_ranges(self.pool).await;

                if let Ok((assigned, rows)) = &artwork {
                    summary.derived.artwork_assigned = *assigned;
                    summary.derived.rows_written += rows;
                }
                if let Ok((written, rows)) = &bitrate {
                    summary.derived.bitrate_ranges_written = *written;
                    summary.derived.rows_written += rows;
                }
                artwork?;
                bitrate?;
            }
        }

        Ok(())
    }

    fn root(&self) -> SyncResult<&'a Path> {
        self.root
            .ok_or(SyncError::RootPathInvalid(ScanError::NotConfigured))
    }

    async fn walk(&self) -> SyncResult<ScannedTree> {
        let root = self.root()?.to_path_buf();
        let tree = tokio::task::spawn_blocking(move || FileScanner::new().scan(&root)).await??;
        Ok(tree)
    }
}
