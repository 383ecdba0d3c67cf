//! audiocat-sync - music folder to catalog synchronizer
//!
//! Walks the music root, reconciles the SQLite catalog with it, prunes rows
//! for removed files and refreshes derived release attributes. Exits
//! non-zero only for fatal errors (invalid root, held lock, unusable
//! catalog); per-file failures are reported in the run summary.

use anyhow::{Context, Result};
use audiocat_common::config::{default_config_path, load_toml_config};
use audiocat_sync::{ActionFlags, CliOverrides, LoftyTagSource, RunOptions, FILE_ERRORS_TARGET};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser, Debug)]
#[command(name = "audiocat-sync")]
#[command(about = "Synchronize a music folder tree into an audio catalog")]
#[command(version)]
struct Args {
    /// Music root folder
    #[arg(short, long, env = "AUDIOCAT_ROOT")]
    root: Option<PathBuf>,

    /// Catalog database file
    #[arg(short, long, env = "AUDIOCAT_CATALOG")]
    catalog: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = "AUDIOCAT_CONFIG")]
    config: Option<PathBuf>,

    /// Re-read every file regardless of stored modification times
    #[arg(long)]
    full_rescan: bool,

    /// Run the explicit schema upgrade
    #[arg(long)]
    upgrade_schema: bool,

    /// Rebuild indexes and full-text tables
    #[arg(long)]
    maintenance: bool,

    /// Only prune orphaned rows
    #[arg(long)]
    orphans_only: bool,

    /// Only recompute artwork and bitrate ranges
    #[arg(long)]
    derived_only: bool,

    /// Concurrent tag readers
    #[arg(long)]
    workers: Option<usize>,

    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let loaded = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration")?,
        None => None,
    };
    let config_found = loaded.is_some();
    let toml_config = loaded.unwrap_or_default();

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    init_tracing(&level, toml_config.logging.error_log.as_deref())?;

    info!("Starting audiocat-sync");
    info!(
        "Version: {} (git {}, {} build {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    // Reported only now: the subscriber did not exist while the file was read
    match &config_path {
        Some(path) if config_found => info!("Loaded configuration from {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => warn!("No config directory on this platform, using defaults"),
    }

    let cli = CliOverrides {
        root: args.root,
        catalog: args.catalog,
        workers: args.workers,
        full_rescan: args.full_rescan,
        flags: ActionFlags {
            upgrade_schema: args.upgrade_schema,
            maintenance: args.maintenance,
            orphans_only: args.orphans_only,
            derived_only: args.derived_only,
        },
    };
    let options = RunOptions::resolve(cli, &toml_config);

    let summary = audiocat_sync::run(&options, Arc::new(LoftyTagSource)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}

/// stderr output filtered by `RUST_LOG` or `level`; optionally a second,
/// plain-text sink that receives only per-file failures
fn init_tracing(level: &str, error_log: Option<&Path>) -> Result<()> {
    let console_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("audiocat_sync={level},audiocat_common={level},{FILE_ERRORS_TARGET}={level}").into());
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_errors = match error_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open error log {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(Targets::new().with_target(FILE_ERRORS_TARGET, LevelFilter::ERROR));
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_errors)
        .init();

    Ok(())
}
