//! Configuration loading and resolution
//!
//! Every setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file is never fatal: a warning is logged and
//! the remaining tiers are used.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::selection::parse_selection;
use crate::{Error, Result};

pub const ENV_BASE: &str = "EXPFACTORY_BASE";
pub const ENV_EXPERIMENTS: &str = "EXPERIMENTS";
pub const ENV_BATTERY: &str = "EXPFACTORY_BATTERY";
pub const ENV_PORT: &str = "EXPFACTORY_PORT";
pub const ENV_LOG: &str = "EXPFACTORY_LOG";
pub const ENV_SUBID: &str = "EXPFACTORY_SUBID";

pub const DEFAULT_BASE: &str = "/scif/apps";
pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Content base directory
    #[serde(default)]
    pub base: Option<PathBuf>,

    /// Local battery skeleton
    #[serde(default)]
    pub battery: Option<PathBuf>,

    /// Web UI port
    #[serde(default)]
    pub port: Option<u16>,

    /// Where the web UI writes generated batteries
    #[serde(default)]
    pub output_root: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Config file locations, user file first
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("expfactory").join("config.toml"));
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc/expfactory/config.toml"));
    }
    candidates
}

/// First existing config file, if any
pub fn find_config_file() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|path| path.is_file())
}

pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&text).map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
}

/// Load the given (or first discovered) config file
///
/// Returns defaults when no file exists. A file that cannot be read or parsed
/// also yields defaults, with the error handed back so the caller can warn
/// once logging is up.
pub fn load_toml_config_or_default(path: Option<&Path>) -> (TomlConfig, Option<Error>) {
    let path = match path.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => path,
        None => return (TomlConfig::default(), None),
    };

    match load_toml_config(&path) {
        Ok(config) => (config, None),
        Err(e) => (TomlConfig::default(), Some(e)),
    }
}

/// Non-empty environment variable value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base: Option<PathBuf>,
    pub experiments: Option<String>,
    pub battery: Option<PathBuf>,
    pub port: Option<u16>,
    pub subject_id: Option<String>,
    pub output_root: Option<PathBuf>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base: PathBuf,
    /// Selected identifiers; empty selects every valid item
    pub selection: Vec<String>,
    pub battery: Option<PathBuf>,
    pub port: u16,
    pub output_root: PathBuf,
    pub subject_id: Option<String>,
    pub log_level: String,
}

impl AppConfig {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let base = cli
            .base
            .clone()
            .or_else(|| env_value(ENV_BASE).map(PathBuf::from))
            .or_else(|| toml.base.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE));

        let selection = cli
            .experiments
            .clone()
            .or_else(|| env_value(ENV_EXPERIMENTS))
            .map(|raw| parse_selection(&raw))
            .unwrap_or_default();

        let battery = cli
            .battery
            .clone()
            .or_else(|| env_value(ENV_BATTERY).map(PathBuf::from))
            .or_else(|| toml.battery.clone());

        let port = match cli.port {
            Some(port) => port,
            None => match env_value(ENV_PORT) {
                Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                    Error::Config(format!("{} must be a port number, got '{}'", ENV_PORT, raw))
                })?,
                None => toml.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let output_root = cli
            .output_root
            .clone()
            .or_else(|| toml.output_root.clone())
            .unwrap_or_else(default_output_root);

        let subject_id = cli.subject_id.clone().or_else(|| env_value(ENV_SUBID));

        Ok(Self {
            base,
            selection,
            battery,
            port,
            output_root,
            subject_id,
            log_level: log_filter(toml),
        })
    }
}

/// Log filter: `EXPFACTORY_LOG`, then `RUST_LOG`, then the config file level
pub fn log_filter(toml: &TomlConfig) -> String {
    env_value(ENV_LOG)
        .or_else(|| env_value("RUST_LOG"))
        .unwrap_or_else(|| toml.logging.level.clone())
}

/// Default folder for batteries generated by the web UI
pub fn default_output_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("expfactory").join("batteries"))
        .unwrap_or_else(|| std::env::temp_dir().join("expfactory"))
}
