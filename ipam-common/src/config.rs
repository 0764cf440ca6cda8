//! Bootstrap configuration loading and root folder resolution
//!
//! Two tiers:
//! 1. **TOML bootstrap**: root folder, listen address, logging, region defaults
//! 2. **Database runtime**: `settings` table (shared secret, default region)
//!
//! A missing or malformed TOML file never stops startup. The loader falls back
//! to compiled defaults and reports why through [`ConfigOrigin`].

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "IPAM_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "ipam.db";

/// Region assigned to records that carry none
pub const DEFAULT_REGION: &str = "Douala";

/// Region names seeded into an empty `regions` table
pub const DEFAULT_KNOWN_REGIONS: &[&str] = &[
    "Douala",
    "Yaoundé",
    "Yaounde",
    "Bafoussam",
    "Bamenda",
    "Buea",
    "Garoua",
    "Kribi",
    "Limbe",
    "Maroua",
    "Ngaoundere",
];

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Region used when a record or import row names none
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Region names seeded on first run
    #[serde(default = "default_known_regions")]
    pub known_regions: Vec<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
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

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_address: default_bind_address(),
            default_region: default_region(),
            known_regions: default_known_regions(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    5730
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_known_regions() -> Vec<String> {
    DEFAULT_KNOWN_REGIONS.iter().map(|r| r.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from an explicit path or the platform default location
    ///
    /// Never fails: unreadable or invalid files are replaced by defaults. The
    /// returned [`ConfigOrigin`] says which happened; log it once tracing is up.
    pub fn load(explicit_path: Option<&Path>) -> (Self, ConfigOrigin) {
        let path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Ok(path) => path,
                Err(e) => return (Self::default(), ConfigOrigin::Defaults(e.to_string())),
            },
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                let reason = format!("could not read file: {}", e);
                return (Self::default(), ConfigOrigin::Fallback { path, reason });
            }
        };

        match Self::from_toml_str(&content) {
            Ok(config) => (config, ConfigOrigin::File(path)),
            Err(e) => {
                let reason = e.to_string();
                (Self::default(), ConfigOrigin::Fallback { path, reason })
            }
        }
    }
}

/// How [`TomlConfig::load`] arrived at its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// No config file located; compiled defaults
    Defaults(String),
    /// A file was named or found but unusable; compiled defaults
    Fallback { path: PathBuf, reason: String },
}

impl ConfigOrigin {
    /// Report the outcome: info for a parsed file, warn for either default
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigOrigin::Defaults(reason) => {
                warn!("No config file loaded ({}), using defaults", reason)
            }
            ConfigOrigin::Fallback { path, reason } => {
                warn!("Config file {}: {}, using defaults", path.display(), reason)
            }
        }
    }
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root_folder) = &config.root_folder {
        return root_folder.clone();
    }

    get_default_root_folder()
}

/// Database file location inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Get default configuration file path for the platform
fn default_config_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/ipam/config.toml first, then /etc/ipam/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("ipam").join("config.toml"));
        let system_config = PathBuf::from("/etc/ipam/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("ipam").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ipam"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ipam"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ipam"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ipam"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("ipam"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ipam"))
    }
}
