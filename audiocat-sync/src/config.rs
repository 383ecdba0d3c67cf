//! Run configuration
//!
//! Merges command-line values with the TOML file. Paths resolve CLI →
//! environment → TOML → compiled default (catalog only; the music root has
//! no default).

use crate::services::sync_controller::SyncOptions;
use audiocat_common::config::{default_catalog_path, resolve_path, TomlConfig, ENV_CATALOG, ENV_ROOT};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One unit of work in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Explicit schema upgrade (the ensure step itself runs on every start)
    UpgradeSchema,
    /// Index rebuild and storage tuning
    Maintenance,
    /// Folder resolve pass followed by the sync pass
    Sync,
    /// Orphan pruning
    PruneOrphans,
    /// Artwork and bitrate-range passes
    DerivedAttributes,
}

impl Action {
    /// Actions that walk the music tree
    pub fn needs_root(self) -> bool {
        matches!(self, Action::Sync | Action::PruneOrphans)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::UpgradeSchema => "upgrade_schema",
            Action::Maintenance => "maintenance",
            Action::Sync => "sync",
            Action::PruneOrphans => "prune_orphans",
            Action::DerivedAttributes => "derived_attributes",
        };
        f.write_str(name)
    }
}

/// Composable action flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionFlags {
    pub upgrade_schema: bool,
    pub maintenance: bool,
    pub orphans_only: bool,
    pub derived_only: bool,
}

impl ActionFlags {
    /// Ordered actions for these flags
    ///
    /// No flag: the default pipeline. Otherwise exactly the selected actions,
    /// always in the order schema → maintenance → orphans → derived.
    pub fn plan(&self) -> Vec<Action> {
        if !(self.upgrade_schema || self.maintenance || self.orphans_only || self.derived_only) {
            return vec![Action::Sync, Action::PruneOrphans, Action::DerivedAttributes];
        }

        let mut plan = Vec::new();
        if self.upgrade_schema {
            plan.push(Action::UpgradeSchema);
        }
        if self.maintenance {
            plan.push(Action::Maintenance);
        }
        if self.orphans_only {
            plan.push(Action::PruneOrphans);
        }
        if self.derived_only {
            plan.push(Action::DerivedAttributes);
        }
        plan
    }
}

/// Values given on the command line (or via their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub workers: Option<usize>,
    pub full_rescan: bool,
    pub flags: ActionFlags,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: Option<PathBuf>,
    pub catalog: PathBuf,
    pub full_rescan: bool,
    pub flags: ActionFlags,
    pub workers: usize,
    pub release_staleness_hours: u64,
}

impl RunOptions {
    /// Merge CLI values over the config file
    pub fn resolve(cli: CliOverrides, toml: &TomlConfig) -> Self {
        let root = resolve_path(cli.root.as_deref(), ENV_ROOT, toml.root_folder.as_deref());
        let catalog = resolve_path(cli.catalog.as_deref(), ENV_CATALOG, toml.catalog_path.as_deref())
            .unwrap_or_else(default_catalog_path);

        Self {
            root,
            catalog,
            full_rescan: cli.full_rescan,
            flags: cli.flags,
            workers: cli.workers.unwrap_or(toml.sync.extraction_workers).max(1),
            release_staleness_hours: toml.sync.release_staleness_hours,
        }
    }

    /// Options for the sync pass
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            full_rescan: self.full_rescan,
            workers: self.workers,
            release_staleness_secs: (self.release_staleness_hours as i64).saturating_mul(3600),
        }
    }
}
