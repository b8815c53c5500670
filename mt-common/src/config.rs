//! Configuration loading and root folder resolution
//!
//! Settings are resolved once at startup and then shared read-only.
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MT_CONFIG` environment variable
//! 3. User config (`~/.config/microtardis/config.toml`)
//! 4. System config (`/etc/microtardis/config.toml`)
//! 5. Compiled defaults (fallback)
//!
//! The root folder follows the same pattern with `MT_ROOT_FOLDER` and the
//! `root_folder` key of the TOML file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MT_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "MT_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Schema namespace used by the facility's built-in filters
pub const DEFAULT_SCHEMA_NAMESPACE: &str = "http://rmmf.isis.rmit.edu.au/schemas";

/// Filter registration as it appears in the TOML file
///
/// ```toml
/// [[filters]]
/// kind = "spc"
/// schema_name = "EDAXGenesis_SPC"
/// namespace = "http://rmmf.isis.rmit.edu.au/schemas"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub kind: String,
    pub schema_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_SCHEMA_NAMESPACE.to_string()
}

/// Raw TOML config file contents. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub file_store_path: Option<PathBuf>,
    pub thumbnails_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub spectrum_schema_name: Option<String>,
    pub exif_schema_suffix: Option<String>,
    pub filters: Option<Vec<FilterConfig>>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Command-line overrides, applied on top of the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
}

/// Immutable portal settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Config file the settings were read from, if any
    pub config_file: Option<PathBuf>,
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub file_store_path: PathBuf,
    pub thumbnails_path: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    pub log_level: String,
    /// Exact schema name of the spectrum family
    pub spectrum_schema_name: String,
    /// Schema name suffix of the EXIF family
    pub exif_schema_suffix: String,
    pub filters: Vec<FilterConfig>,
}

impl Settings {
    /// Resolve settings from CLI overrides, environment and config file
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let config_file = resolve_config_file(overrides.config.as_deref())?;
        let toml_config = match &config_file {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        let root_folder = resolve_root_folder(
            overrides.root_folder.as_deref(),
            toml_config.root_folder.as_deref(),
        );

        let mut settings = Self::from_toml(root_folder, toml_config);
        settings.config_file = config_file;
        if let Some(port) = overrides.port {
            settings.port = port;
        }
        Ok(settings)
    }

    /// Build settings for a root folder with every other key at its default
    pub fn with_root(root_folder: impl Into<PathBuf>) -> Self {
        Self::from_toml(root_folder.into(), TomlConfig::default())
    }

    fn from_toml(root_folder: PathBuf, config: TomlConfig) -> Self {
        Self {
            config_file: None,
            database_path: config
                .database_path
                .unwrap_or_else(|| root_folder.join("microtardis.db")),
            file_store_path: config
                .file_store_path
                .unwrap_or_else(|| root_folder.join("store")),
            thumbnails_path: config
                .thumbnails_path
                .unwrap_or_else(|| root_folder.join("thumbnails")),
            bind_addr: config.bind_addr.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: config.port.unwrap_or(DEFAULT_PORT),
            log_level: config.log_level.unwrap_or_else(|| "info".to_string()),
            spectrum_schema_name: config
                .spectrum_schema_name
                .unwrap_or_else(|| "EDAXGenesis_SPC".to_string()),
            exif_schema_suffix: config
                .exif_schema_suffix
                .unwrap_or_else(|| "EXIF".to_string()),
            filters: config.filters.unwrap_or_else(default_filters),
            root_folder,
        }
    }

    /// Socket address string for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Built-in post-save filter registrations
pub fn default_filters() -> Vec<FilterConfig> {
    vec![
        FilterConfig {
            kind: "exif".to_string(),
            schema_name: "MICROSCOPY_EXIF".to_string(),
            namespace: default_namespace(),
        },
        FilterConfig {
            kind: "spc".to_string(),
            schema_name: "EDAXGenesis_SPC".to_string(),
            namespace: default_namespace(),
        },
    ]
}

/// Locate the config file
///
/// An explicitly requested file (CLI or env) must exist; the per-user and
/// system-wide locations are optional.
pub fn resolve_config_file(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf()).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return require_exists(PathBuf::from(path)).map(Some);
    }

    // Priority 3/4: platform locations
    let user_config = dirs::config_dir().map(|d| d.join("microtardis").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let system_config = PathBuf::from("/etc/microtardis/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Ok(Some(system_config));
    }

    Ok(None)
}

fn require_exists(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {}", path.display())))
    }
}

/// Resolve the root folder: CLI, then environment, then TOML, then default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("microtardis"))
        .unwrap_or_else(|| PathBuf::from("./microtardis_data"))
}
