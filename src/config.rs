use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default namespace for commands that don't specify one.
fn default_namespace() -> String {
    "default".to_string()
}

/// Default tracing filter when `RUST_LOG` is unset.
fn default_log_filter() -> String {
    "info".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives, e.g. `"remote_keys=debug"`.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the secret store directory. If relative, resolved from the
    /// config file location. Defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Namespace used when a command doesn't name one.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            namespace: default_namespace(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
    pub log: LogConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./remote-keys.toml` if it exists in current directory
/// 2. `~/.local/share/remote-keys/remote-keys.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("remote-keys.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("remote-keys").join("remote-keys.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self {
            data_dir: config.resolve_data_dir(config_dir),
            namespace: config.namespace,
            log: config.log,
        })
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the data directory is the config file's intended parent.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        let config = Config::default();
        Ok(Self {
            data_dir: config_dir.to_path_buf(),
            namespace: config.namespace,
            log: config.log,
        })
    }
}
