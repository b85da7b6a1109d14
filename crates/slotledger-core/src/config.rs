//! Configuration resolution for Slotledger.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/slotledger/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Slotledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file. `None` means the platform default from [`database_path`].
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Env-filter directive scoping `level` to the Slotledger crates.
    pub fn filter_directive(&self) -> String {
        let level = &self.level;
        format!("slotledger={level},slotledger_core={level},slotledger_store={level}")
    }
}

/// One config file layer. Only the keys a file sets override lower layers.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    database: DatabaseFile,
    logging: LoggingFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseFile {
    path: Option<PathBuf>,
    max_connections: Option<u32>,
    busy_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingFile {
    level: Option<String>,
    json: Option<bool>,
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` is a file named on the command line; unlike the global file it
/// must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = explicit {
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("slotledger.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".slotledger"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/slotledger"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("slotledger"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| Error::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_config(base: &mut Config, overlay: ConfigFile) {
    let ConfigFile { database, logging } = overlay;
    if database.path.is_some() {
        base.database.path = database.path;
    }
    if let Some(n) = database.max_connections {
        base.database.max_connections = n;
    }
    if let Some(n) = database.busy_timeout_secs {
        base.database.busy_timeout_secs = n;
    }
    if let Some(level) = logging.level {
        base.logging.level = level;
    }
    if let Some(json) = logging.json {
        base.logging.json = json;
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("SLOTLEDGER_DATABASE_PATH") {
        config.database.path = Some(PathBuf::from(val));
    }
    if let Some(n) = var("SLOTLEDGER_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
        config.database.max_connections = n;
    }
    if let Some(n) = var("SLOTLEDGER_BUSY_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.database.busy_timeout_secs = n;
    }
    if let Some(val) = var("SLOTLEDGER_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = var("SLOTLEDGER_LOG_JSON") {
        config.logging.json = matches!(val.as_str(), "1" | "true" | "yes");
    }
}
