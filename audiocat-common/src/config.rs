//! Configuration loading and path resolution
//!
//! Bootstrap configuration comes from an optional TOML file. Paths resolve in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the music root
pub const ENV_ROOT: &str = "AUDIOCAT_ROOT";

/// Environment variable naming the catalog file
pub const ENV_CATALOG: &str = "AUDIOCAT_CATALOG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root of the music tree to catalog
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// SQLite catalog file
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Per-file failure log (optional, failures still go to stderr)
    #[serde(default)]
    pub error_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            error_log: None,
        }
    }
}

/// Sync tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Release rows younger than this are not refreshed on re-scan
    #[serde(default = "default_staleness_hours")]
    pub release_staleness_hours: u64,

    /// Concurrent tag readers
    #[serde(default = "default_workers")]
    pub extraction_workers: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            release_staleness_hours: default_staleness_hours(),
            extraction_workers: default_workers(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_staleness_hours() -> u64 {
    168
}

fn default_workers() -> usize {
    4
}

/// Default config file location: `<config_dir>/audiocat/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("audiocat").join("config.toml"))
}

/// Default catalog location: `<data_local_dir>/audiocat/catalog.db`
pub fn default_catalog_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("audiocat"))
        .unwrap_or_else(|| PathBuf::from("./audiocat_data"))
        .join("catalog.db")
}

/// Load TOML configuration
///
/// A missing file is not an error: `None` is returned and the caller falls
/// back to defaults (and says so once its logging is up). A file that exists
/// but cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(Some(config))
}

/// Resolve a path setting: CLI → environment → TOML
///
/// Returns `None` when no source provides a value; callers apply their own
/// compiled default.
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    toml_value.map(Path::to_path_buf)
}
