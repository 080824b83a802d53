//! Configuration loading and registry store path resolution
//!
//! Store path priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `PAXREG_DATABASE`
//! 3. TOML config file (`database_path`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result, SourceKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the store path
pub const DATABASE_ENV_VAR: &str = "PAXREG_DATABASE";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to the SQLite registry file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Consolidation phase settings
#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidationConfig {
    /// Order in which upstream sources are folded into profiles
    ///
    /// The order decides which source supplies first-come scalar values and
    /// which fallback index an ambiguous record attaches to.
    #[serde(default = "default_source_order")]
    pub source_order: Vec<SourceKind>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            source_order: default_source_order(),
        }
    }
}

/// Cluster merge settings
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Run `VACUUM` after a committed merge
    #[serde(default = "default_vacuum")]
    pub vacuum: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            vacuum: default_vacuum(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_order() -> Vec<SourceKind> {
    SourceKind::DEFAULT_ORDER.to_vec()
}

fn default_vacuum() -> bool {
    true
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        validate_source_order(&config.consolidation.source_order)?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present; otherwise built-in defaults apply. Runs before the
    /// subscriber is installed, so callers report the source themselves
    /// (see [`config_file_path`]).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = config_file_path(explicit) else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Reject empty or repeated source lists
pub fn validate_source_order(order: &[SourceKind]) -> Result<()> {
    if order.is_empty() {
        return Err(Error::Config("source_order must name at least one source".to_string()));
    }

    let mut seen = HashSet::new();
    for kind in order {
        if !seen.insert(*kind) {
            return Err(Error::Config(format!("Source listed twice: {}", kind)));
        }
    }
    Ok(())
}

/// Parse a comma-separated source list (CLI form)
pub fn parse_source_list(list: &str) -> Result<Vec<SourceKind>> {
    let order = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<SourceKind>>>()?;
    validate_source_order(&order)?;
    Ok(order)
}

/// Resolve the registry store path following the priority order
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
        warn!("{} is set but empty, ignoring", DATABASE_ENV_VAR);
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

/// Config file `TomlConfig::load` reads, or `None` for built-in defaults
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.exists()),
    }
}

/// Platform config file location (`<config dir>/paxreg/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paxreg").join("config.toml"))
}

/// OS-dependent default registry path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("paxreg").join("registry.db"))
        .unwrap_or_else(|| PathBuf::from("./registry.db"))
}
